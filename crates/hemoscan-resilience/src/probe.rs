//! Health probe
//!
//! Issues the backend's cheap liveness check through the retry orchestrator
//! and reports the total latency. The probe never decides what the outcome
//! means for the UI; that is the [`StatusClassifier`](crate::StatusClassifier)'s job.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::backend::AnalysisBackend;
use crate::error::{OperationFailure, ResilienceError};
use crate::policy::RetryPolicy;
use crate::retry::RetryOrchestrator;

/// Per-attempt bound on a single liveness check
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A probe that reached the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSuccess {
    /// Wall time of the whole probe, retries and backoff included
    pub latency: Duration,
}

/// Result of one probe
pub type ProbeOutcome = Result<ProbeSuccess, ResilienceError>;

/// Checks backend liveness under the health-probe retry policy
#[derive(Debug, Clone)]
pub struct HealthProbe {
    backend: Arc<dyn AnalysisBackend>,
    orchestrator: RetryOrchestrator,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl HealthProbe {
    /// Create a probe with [`RetryPolicy::health_probe`]
    pub fn new(backend: Arc<dyn AnalysisBackend>, orchestrator: RetryOrchestrator) -> Self {
        Self {
            backend,
            orchestrator,
            policy: RetryPolicy::health_probe(),
            attempt_timeout: PROBE_TIMEOUT,
        }
    }

    /// Use a different retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound each liveness check attempt
    #[must_use]
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// The retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The orchestrator probes run through
    pub fn orchestrator(&self) -> &RetryOrchestrator {
        &self.orchestrator
    }

    /// Probe the backend once
    pub async fn probe(&self) -> ProbeOutcome {
        self.probe_with_cancellation(&CancellationToken::new()).await
    }

    /// Probe the backend, aborting when `cancel` fires
    #[instrument(skip_all)]
    pub async fn probe_with_cancellation(&self, cancel: &CancellationToken) -> ProbeOutcome {
        let started = Instant::now();
        let backend = &self.backend;
        let attempt_timeout = self.attempt_timeout;

        self.orchestrator
            .execute_with_cancellation("health_check", &self.policy, cancel, || async move {
                match timeout(attempt_timeout, backend.check_health()).await {
                    Ok(result) => result,
                    Err(_) => Err(OperationFailure::retryable(format!(
                        "health check timed out after {attempt_timeout:?}"
                    ))),
                }
            })
            .await?;

        let latency = started.elapsed();
        debug!(latency_ms = latency.as_millis() as u64, "Health probe succeeded");
        Ok(ProbeSuccess { latency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AnalysisReport, Document, HealthReport, PatientAttributes};
    use crate::connectivity::ConnectivityGate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FlakyHealth {
        failures_before_success: u32,
        calls: AtomicU32,
        hang: bool,
    }

    #[async_trait]
    impl AnalysisBackend for FlakyHealth {
        async fn submit(
            &self,
            _document: &Document,
            _attributes: &PatientAttributes,
        ) -> Result<AnalysisReport, OperationFailure> {
            Ok(AnalysisReport::default())
        }

        async fn check_health(&self) -> Result<HealthReport, OperationFailure> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if n < self.failures_before_success {
                Err(OperationFailure::retryable("connection refused"))
            } else {
                Ok(HealthReport {
                    status: "healthy".to_string(),
                    message: "ok".to_string(),
                })
            }
        }
    }

    fn probe(backend: FlakyHealth) -> HealthProbe {
        let orchestrator = RetryOrchestrator::with_defaults(ConnectivityGate::new(true));
        HealthProbe::new(Arc::new(backend), orchestrator)
    }

    #[tokio::test(start_paused = true)]
    async fn latency_includes_backoff() {
        let probe = probe(FlakyHealth {
            failures_before_success: 1,
            calls: AtomicU32::new(0),
            hang: false,
        });

        let success = probe.probe().await.unwrap();
        assert_eq!(success.latency, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_backend_times_out_per_attempt() {
        let probe = probe(FlakyHealth {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
            hang: true,
        })
        .with_attempt_timeout(Duration::from_secs(2));

        let started = Instant::now();
        let err = probe.probe().await.unwrap_err();
        assert!(matches!(err, ResilienceError::RetryExhausted { attempts: 3, .. }));
        // 3 x 2s timeouts plus 1s + 2s backoff
        assert_eq!(started.elapsed(), Duration::from_secs(9));
    }
}
