//! Health status and the status classifier
//!
//! The classifier is a pure function from a probe outcome to a
//! [`HealthStatus`]. Statuses are always built whole and replaced whole; nothing
//! mutates a published status in place.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ResilienceError;
use crate::probe::ProbeOutcome;

/// Latency above which a reachable backend is reported as slow
pub const SLOW_THRESHOLD: Duration = Duration::from_secs(10);

/// Coarse backend health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// A probe is in progress
    #[default]
    Checking,
    /// Reachable and responsive
    Online,
    /// Reachable but degraded
    Slow,
    /// Unreachable or still starting
    Offline,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => f.write_str("checking"),
            Self::Online => f.write_str("online"),
            Self::Slow => f.write_str("slow"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// A complete, immutable health record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Coarse state
    pub state: HealthState,
    /// Human-readable explanation
    pub message: String,
    /// Probe latency, when a probe succeeded
    pub latency: Option<Duration>,
    /// Set on the terminal status published once auto-probing has stopped
    pub manual_retry_required: bool,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::checking()
    }
}

impl HealthStatus {
    /// Status shown while a probe runs
    pub fn checking() -> Self {
        Self {
            state: HealthState::Checking,
            message: "Checking connection to the server...".to_string(),
            latency: None,
            manual_retry_required: false,
        }
    }

    /// Backend reachable within the slow threshold
    pub fn online(latency: Duration) -> Self {
        Self {
            state: HealthState::Online,
            message: "Server online.".to_string(),
            latency: Some(latency),
            manual_retry_required: false,
        }
    }

    /// Backend reachable but slow
    pub fn slow(latency: Duration) -> Self {
        Self {
            state: HealthState::Slow,
            message: format!(
                "Server is responding slowly ({:.1}s). Analysis still works but the first one may take several minutes.",
                latency.as_secs_f64()
            ),
            latency: Some(latency),
            manual_retry_required: false,
        }
    }

    /// Backend unreachable
    ///
    /// `prior_failures` is the scheduler's consecutive failure count before
    /// this probe; repeated failures suggest a cold start rather than a blip.
    pub fn offline(prior_failures: u32) -> Self {
        let message = if prior_failures > 2 {
            "The server may still be starting up. Wait a few minutes and try again."
        } else {
            "Trying to connect to the server..."
        };
        Self {
            state: HealthState::Offline,
            message: message.to_string(),
            latency: None,
            manual_retry_required: false,
        }
    }

    /// Terminal status once the scheduler has given up
    pub fn suspended(last: &HealthStatus, failures: u32) -> Self {
        Self {
            state: last.state,
            message: format!(
                "Server still unavailable after {failures} checks. Retry manually when ready."
            ),
            latency: last.latency,
            manual_retry_required: true,
        }
    }

    /// Whether this status calls for another automatic check
    pub fn is_unfavorable(&self) -> bool {
        matches!(self.state, HealthState::Offline | HealthState::Slow)
    }
}

/// Derives a [`HealthStatus`] from a probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusClassifier {
    slow_threshold: Duration,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(SLOW_THRESHOLD)
    }
}

impl StatusClassifier {
    /// Create a classifier with a custom slow threshold
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }

    /// The configured slow threshold
    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    /// Classify a probe outcome with no failure history
    pub fn classify(&self, outcome: &ProbeOutcome) -> HealthStatus {
        self.classify_with_history(outcome, 0)
    }

    /// Classify a probe outcome, given the consecutive failures before it
    pub fn classify_with_history(&self, outcome: &ProbeOutcome, prior_failures: u32) -> HealthStatus {
        match outcome {
            Ok(success) if success.latency > self.slow_threshold => {
                HealthStatus::slow(success.latency)
            }
            Ok(success) => HealthStatus::online(success.latency),
            Err(ResilienceError::Cancelled { .. }) => HealthStatus::checking(),
            Err(_) => HealthStatus::offline(prior_failures),
        }
    }
}
