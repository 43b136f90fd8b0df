//! Retry orchestrator
//!
//! Runs a caller-supplied async operation under a [`RetryPolicy`]:
//!
//! 1. Before the first attempt, waits on the [`ConnectivityGate`] for a short
//!    fixed bound. If the transport never comes up, fails with
//!    [`ResilienceError::Connectivity`] without consuming an attempt.
//! 2. Runs attempts strictly in sequence. Success returns immediately. A
//!    fatal failure, or a retryable failure on the last allowed attempt,
//!    terminates with the attempt count and elapsed time.
//! 3. Between attempts, re-waits on the gate if connectivity dropped, then
//!    sleeps for the policy's backoff delay.
//!
//! The orchestrator holds no per-call state, so one instance can serve any
//! number of concurrent, independent calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::connectivity::ConnectivityGate;
use crate::error::{OperationFailure, ResilienceError, ResilienceResult};
use crate::policy::RetryPolicy;
use crate::sink::{ResilienceEvent, SharedSink, TracingSink};

/// Default bound for connectivity waits, independent of any policy
pub const CONNECTIVITY_WAIT: Duration = Duration::from_secs(5);

/// Stateless executor of retrying remote operations
#[derive(Debug, Clone)]
pub struct RetryOrchestrator {
    gate: ConnectivityGate,
    connectivity_wait: Duration,
    sink: SharedSink,
}

impl RetryOrchestrator {
    /// Create an orchestrator reporting to the given sink
    pub fn new(gate: ConnectivityGate, sink: SharedSink) -> Self {
        Self {
            gate,
            connectivity_wait: CONNECTIVITY_WAIT,
            sink,
        }
    }

    /// Create an orchestrator that logs through `tracing`
    pub fn with_defaults(gate: ConnectivityGate) -> Self {
        Self::new(gate, Arc::new(TracingSink))
    }

    /// Override the connectivity wait bound
    pub fn with_connectivity_wait(mut self, bound: Duration) -> Self {
        self.connectivity_wait = bound;
        self
    }

    /// The gate consulted between attempts
    pub fn gate(&self) -> &ConnectivityGate {
        &self.gate
    }

    /// The connectivity wait bound
    pub fn connectivity_wait(&self) -> Duration {
        self.connectivity_wait
    }

    /// Execute `operation` under `policy`
    ///
    /// # Errors
    ///
    /// - [`ResilienceError::Connectivity`] if the transport stays unreachable
    /// - [`ResilienceError::Fatal`] on the first fatal failure
    /// - [`ResilienceError::RetryExhausted`] once `policy.max_attempts` retryable
    ///   failures have occurred
    /// - [`ResilienceError::InvalidConfiguration`] if the policy is invalid
    pub async fn execute<T, F, Fut>(
        &self,
        operation_name: &str,
        policy: &RetryPolicy,
        operation: F,
    ) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationFailure>>,
    {
        self.execute_with_cancellation(operation_name, policy, &CancellationToken::new(), operation)
            .await
    }

    /// Execute `operation` under `policy`, aborting when `cancel` fires
    ///
    /// Cancellation interrupts an in-flight attempt, a connectivity wait, or a
    /// backoff sleep.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), plus [`ResilienceError::Cancelled`].
    #[instrument(skip_all, fields(operation = %operation_name, max_attempts = policy.max_attempts))]
    pub async fn execute_with_cancellation<T, F, Fut>(
        &self,
        operation_name: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationFailure>>,
    {
        policy.validate()?;
        let started = Instant::now();

        self.ensure_connectivity(operation_name, cancel, 0).await?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let attempt_started = Instant::now();

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ResilienceError::Cancelled { attempts }),
                result = operation() => result,
            };

            let failure = match result {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(attempts, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            self.sink.record(&ResilienceEvent::AttemptFailed {
                operation: operation_name.to_string(),
                attempt: attempts,
                class: failure.class,
                message: failure.message.clone(),
                elapsed: attempt_started.elapsed(),
            });

            if !failure.is_retryable() {
                self.sink.record(&ResilienceEvent::FatalFailure {
                    operation: operation_name.to_string(),
                    attempts,
                    message: failure.message.clone(),
                });
                return Err(ResilienceError::Fatal {
                    message: failure.message,
                    attempts,
                    elapsed: started.elapsed(),
                    status: failure.status,
                });
            }

            if !policy.allows_another(attempts) {
                self.sink.record(&ResilienceEvent::RetryExhausted {
                    operation: operation_name.to_string(),
                    attempts,
                });
                return Err(ResilienceError::RetryExhausted {
                    attempts,
                    last_error: failure,
                    elapsed: started.elapsed(),
                });
            }

            // Not an attempt
            self.ensure_connectivity(operation_name, cancel, attempts)
                .await?;

            let delay = policy.delay_for(attempts - 1);
            self.sink.record(&ResilienceEvent::RetryScheduled {
                operation: operation_name.to_string(),
                attempt: attempts + 1,
                delay,
            });

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ResilienceError::Cancelled { attempts }),
                () = sleep(delay) => {}
            }
        }
    }

    async fn ensure_connectivity(
        &self,
        operation_name: &str,
        cancel: &CancellationToken,
        attempts: u32,
    ) -> ResilienceResult<()> {
        if self.gate.is_reachable() {
            return Ok(());
        }

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ResilienceError::Cancelled { attempts }),
            outcome = self.gate.await_reachable(self.connectivity_wait) => outcome,
        };

        self.sink.record(&ResilienceEvent::ConnectivityWait {
            operation: operation_name.to_string(),
            restored: outcome.is_ok(),
        });

        outcome.map_err(|_| ResilienceError::Connectivity {
            waited: self.connectivity_wait,
            attempts,
        })
    }
}
