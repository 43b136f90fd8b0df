//! Failure classification and the resilience error taxonomy.
//!
//! Two layers live here:
//!
//! - [`OperationFailure`] is what a single attempt of a remote operation
//!   produces. The transport classifies it exactly once, at its boundary,
//!   into [`FailureClass::Retryable`] or [`FailureClass::Fatal`].
//! - [`ResilienceError`] is what the orchestrator, the connectivity gate, and
//!   the scheduler hand back to their callers once a decision has been made.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specialized `Result` type for resilience operations.
pub type ResilienceResult<T> = std::result::Result<T, ResilienceError>;

/// Whether a failed attempt may succeed if attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Timeouts, connection resets, server-side (5xx-equivalent) errors.
    Retryable,
    /// Malformed or semantically rejected requests (4xx-equivalent).
    Fatal,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retryable => f.write_str("retryable"),
            Self::Fatal => f.write_str("fatal"),
        }
    }
}

/// A classified failure of one attempt of a remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{class} failure: {message}")]
pub struct OperationFailure {
    /// Retry classification decided at the transport boundary
    pub class: FailureClass,
    /// Human-readable detail, passed through unaltered for fatal failures
    pub message: String,
    /// Status-code-like signal from the far side, when one exists
    pub status: Option<u16>,
}

impl OperationFailure {
    /// Create a retryable failure.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            class: FailureClass::Retryable,
            message: message.into(),
            status: None,
        }
    }

    /// Create a fatal failure.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            class: FailureClass::Fatal,
            message: message.into(),
            status: None,
        }
    }

    /// Attach a status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether this failure may be retried.
    pub fn is_retryable(&self) -> bool {
        self.class == FailureClass::Retryable
    }
}

/// Errors surfaced by the resilience layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResilienceError {
    /// The transport never became reachable within the wait bound.
    #[error("transport unreachable after waiting {waited:?}")]
    Connectivity {
        /// How long the caller waited for connectivity
        waited: Duration,
        /// Attempts made before connectivity was lost (zero when the wait
        /// happened before the first attempt)
        attempts: u32,
    },

    /// Retryable failures persisted through every allowed attempt.
    #[error("operation failed after {attempts} attempt(s) in {elapsed:?}: {last_error}")]
    RetryExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The failure of the final attempt
        last_error: OperationFailure,
        /// Total time spent, including backoff
        elapsed: Duration,
    },

    /// The remote side rejected the request as invalid or unprocessable.
    #[error("{message}")]
    Fatal {
        /// Detail from the remote side, unaltered
        message: String,
        /// Number of attempts made before the fatal outcome
        attempts: u32,
        /// Total time spent
        elapsed: Duration,
        /// Status-code-like signal, if the transport provided one
        status: Option<u16>,
    },

    /// The reconnect scheduler hit its failure cap and stopped auto-probing.
    #[error("reconnect scheduler suspended after {failures} consecutive failures")]
    SchedulerSuspended {
        /// Consecutive failures at the time of suspension
        failures: u32,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts started before cancellation
        attempts: u32,
    },

    /// A policy or configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Generic prompt shown for connectivity-type failures.
pub const CONNECTIVITY_MESSAGE: &str =
    "Could not reach the analysis server. Check your connection and try again.";

impl ResilienceError {
    /// Whether the failure was a fatal rejection by the remote side.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Whether the failure suggests the backend or the network is unavailable.
    ///
    /// These are the failures after which a health re-check is worthwhile.
    pub fn is_connectivity_related(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::RetryExhausted { .. })
    }

    /// Number of attempts made, where meaningful.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetryExhausted { attempts, .. }
            | Self::Fatal { attempts, .. }
            | Self::Connectivity { attempts, .. }
            | Self::Cancelled { attempts } => Some(*attempts),
            _ => None,
        }
    }

    /// The message a user interface should display for this error.
    ///
    /// Fatal rejections keep the remote detail verbatim. Exhaustion and
    /// connectivity failures get a generic prompt plus the attempt count and
    /// never the low-level error text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fatal { message, .. } => message.clone(),
            Self::RetryExhausted { attempts, .. } | Self::Connectivity { attempts, .. } => {
                format!("{CONNECTIVITY_MESSAGE} ({attempts} attempt(s) made)")
            }
            Self::SchedulerSuspended { .. } => {
                "The server is not responding. Retry manually when ready.".to_string()
            }
            Self::Cancelled { .. } => "The operation was cancelled.".to_string(),
            Self::InvalidConfiguration(detail) => format!("Configuration error: {detail}"),
        }
    }
}
