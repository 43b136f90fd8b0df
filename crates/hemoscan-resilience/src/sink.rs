//! Observer interface for notable resilience transitions
//!
//! The core reports what happened (a failed attempt, an exhausted budget, a
//! status change) to an injected [`EventSink`]. Retention is the sink's
//! business: [`TracingSink`] forwards to `tracing`, [`RingBufferSink`] keeps a
//! bounded history that can be exported for diagnostics.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::FailureClass;
use crate::status::HealthStatus;

/// Something worth reporting happened inside the resilience layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ResilienceEvent {
    /// One attempt of an operation failed
    AttemptFailed {
        /// Operation label
        operation: String,
        /// 1-based attempt number
        attempt: u32,
        /// Classification of the failure
        class: FailureClass,
        /// Failure detail
        message: String,
        /// Duration of the failed attempt
        elapsed: Duration,
    },
    /// A retry will run after `delay`
    RetryScheduled {
        /// Operation label
        operation: String,
        /// 1-based number of the attempt that will run next
        attempt: u32,
        /// Backoff before that attempt
        delay: Duration,
    },
    /// Retryable failures used up the whole attempt budget
    RetryExhausted {
        /// Operation label
        operation: String,
        /// Attempts made
        attempts: u32,
    },
    /// The operation was rejected and will not be retried
    FatalFailure {
        /// Operation label
        operation: String,
        /// Attempts made
        attempts: u32,
        /// Rejection detail
        message: String,
    },
    /// The orchestrator waited on the connectivity gate
    ConnectivityWait {
        /// Operation label
        operation: String,
        /// Whether connectivity came back within the bound
        restored: bool,
    },
    /// A new health status was published
    StatusChanged {
        /// The published status
        status: HealthStatus,
    },
    /// The reconnect scheduler stopped auto-probing
    SchedulerSuspended {
        /// Consecutive failures at suspension time
        failures: u32,
    },
}

/// Receives resilience events
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Record one event
    fn record(&self, event: &ResilienceEvent);
}

/// Shared sink handle
pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &ResilienceEvent) {
        match event {
            ResilienceEvent::AttemptFailed {
                operation,
                attempt,
                class,
                message,
                elapsed,
            } => warn!(
                operation = %operation,
                attempt,
                class = %class,
                elapsed_ms = elapsed.as_millis() as u64,
                "Attempt failed: {message}"
            ),
            ResilienceEvent::RetryScheduled {
                operation,
                attempt,
                delay,
            } => debug!(
                operation = %operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retry scheduled"
            ),
            ResilienceEvent::RetryExhausted {
                operation,
                attempts,
            } => warn!(operation = %operation, attempts, "Retry budget exhausted"),
            ResilienceEvent::FatalFailure {
                operation,
                attempts,
                message,
            } => warn!(operation = %operation, attempts, "Fatal failure: {message}"),
            ResilienceEvent::ConnectivityWait {
                operation,
                restored,
            } => debug!(operation = %operation, restored, "Connectivity wait finished"),
            ResilienceEvent::StatusChanged { status } => info!(
                state = %status.state,
                latency_ms = status.latency.map(|l| l.as_millis() as u64),
                "Health status: {}",
                status.message
            ),
            ResilienceEvent::SchedulerSuspended { failures } => {
                warn!(failures, "Reconnect scheduler suspended")
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &ResilienceEvent) {}
}

/// An event with the wall-clock time it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// When the event was recorded
    pub at: DateTime<Utc>,
    /// The event itself
    pub event: ResilienceEvent,
}

/// Bounded in-memory event history; the oldest entry is evicted first
#[derive(Debug)]
pub struct RingBufferSink {
    capacity: usize,
    entries: Mutex<VecDeque<RecordedEvent>>,
}

impl Default for RingBufferSink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl RingBufferSink {
    /// Default number of retained events
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Create a ring buffer holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Retained events, oldest first
    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop all retained events
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Export the history as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns the serializer error if an event cannot be encoded.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl EventSink for RingBufferSink {
    fn record(&self, event: &ResilienceEvent) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(RecordedEvent {
            at: Utc::now(),
            event: event.clone(),
        });
    }
}

/// Forwards every event to each inner sink
#[derive(Debug, Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream sink
    pub fn with(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn record(&self, event: &ResilienceEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
