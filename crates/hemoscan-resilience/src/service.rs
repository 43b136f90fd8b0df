//! UI-facing facade over the resilience layer
//!
//! [`AnalysisService`] wires one backend, one connectivity gate, and one event
//! sink into the orchestrator, the probe, the status board, and the reconnect
//! scheduler, then exposes only what a user interface needs: the current
//! status, change notifications, monitoring lifecycle, and document
//! submission.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::backend::{AnalysisBackend, AnalysisReport, Document, PatientAttributes};
use crate::board::{StatusBoard, StatusSubscription};
use crate::config::ResilienceConfig;
use crate::connectivity::ConnectivityGate;
use crate::error::ResilienceResult;
use crate::probe::HealthProbe;
use crate::retry::RetryOrchestrator;
use crate::scheduler::ReconnectScheduler;
use crate::sink::SharedSink;
use crate::status::{HealthState, HealthStatus, StatusClassifier};

/// Resilient client for the remote analysis service
#[derive(Debug)]
pub struct AnalysisService {
    backend: Arc<dyn AnalysisBackend>,
    orchestrator: RetryOrchestrator,
    probe: HealthProbe,
    classifier: StatusClassifier,
    board: StatusBoard,
    scheduler: ReconnectScheduler,
    config: ResilienceConfig,
}

impl AnalysisService {
    /// Assemble a service around `backend`
    ///
    /// # Errors
    ///
    /// Returns [`ResilienceError::InvalidConfiguration`](crate::ResilienceError::InvalidConfiguration)
    /// if `config` does not validate.
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        gate: ConnectivityGate,
        config: ResilienceConfig,
        sink: SharedSink,
    ) -> ResilienceResult<Self> {
        config.validate()?;

        let orchestrator = RetryOrchestrator::new(gate, sink.clone())
            .with_connectivity_wait(config.connectivity_wait);
        let probe = HealthProbe::new(backend.clone(), orchestrator.clone())
            .with_policy(config.health_policy.clone());
        let classifier = StatusClassifier::new(config.slow_threshold);
        let board = StatusBoard::new(sink.clone());
        let scheduler = ReconnectScheduler::new(
            probe.clone(),
            classifier,
            board.clone(),
            config.scheduler.clone(),
            sink,
        );

        Ok(Self {
            backend,
            orchestrator,
            probe,
            classifier,
            board,
            scheduler,
            config,
        })
    }

    /// The last published status
    pub fn current_status(&self) -> HealthStatus {
        self.board.current()
    }

    /// Register a listener for status changes
    pub fn on_status_change<F>(&self, listener: F) -> StatusSubscription
    where
        F: Fn(&HealthStatus) + Send + Sync + 'static,
    {
        self.board.on_change(listener)
    }

    /// Follow status changes asynchronously
    pub fn watch_status(&self) -> watch::Receiver<HealthStatus> {
        self.board.watch()
    }

    /// Start background health monitoring
    ///
    /// Returns `false` if monitoring is already active.
    pub fn start_monitoring(&self) -> bool {
        self.scheduler.start()
    }

    /// Stop background health monitoring
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }

    /// The reconnect scheduler
    pub fn scheduler(&self) -> &ReconnectScheduler {
        &self.scheduler
    }

    /// The connectivity gate shared by every operation
    pub fn gate(&self) -> &ConnectivityGate {
        self.orchestrator.gate()
    }

    /// The active configuration
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Probe the backend once and publish the result
    ///
    /// Independent of the scheduler's timer; if both publish, the later one
    /// wins. An Online result also clears the scheduler's failure count.
    pub async fn probe_now(&self) -> HealthStatus {
        let outcome = self.probe.probe().await;
        let status = self
            .classifier
            .classify_with_history(&outcome, self.scheduler.consecutive_failures());
        if status.state == HealthState::Online {
            self.scheduler.record_success();
        }
        self.board.publish(status.clone());
        status
    }

    /// Submit a document for analysis
    ///
    /// # Errors
    ///
    /// See [`run_submission_with_cancellation`](Self::run_submission_with_cancellation).
    pub async fn run_submission(
        &self,
        document: &Document,
        attributes: &PatientAttributes,
    ) -> ResilienceResult<AnalysisReport> {
        self.run_submission_with_cancellation(document, attributes, &CancellationToken::new())
            .await
    }

    /// Submit a document for analysis, aborting when `cancel` fires
    ///
    /// Connectivity-type failures re-arm the reconnect scheduler before the
    /// error is returned, so the status indicator catches up with what the
    /// submission just learned.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's classified error: `Fatal` with the service's
    /// detail, `RetryExhausted`, `Connectivity`, or `Cancelled`.
    #[instrument(skip_all, fields(file = %document.file_name, size = document.len()))]
    pub async fn run_submission_with_cancellation(
        &self,
        document: &Document,
        attributes: &PatientAttributes,
        cancel: &CancellationToken,
    ) -> ResilienceResult<AnalysisReport> {
        let backend = &self.backend;
        let result = self
            .orchestrator
            .execute_with_cancellation(
                "submit_document",
                &self.config.submission_policy,
                cancel,
                || backend.submit(document, attributes),
            )
            .await;

        match &result {
            Ok(report) => info!(
                findings = report.lab_findings.len(),
                "Document analysis completed"
            ),
            Err(err) if err.is_connectivity_related() => {
                warn!(error = %err, "Submission failed on connectivity, re-checking backend health");
                self.scheduler.start();
            }
            Err(err) => warn!(error = %err, "Submission failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Gender, HealthReport};
    use crate::error::{OperationFailure, ResilienceError};
    use crate::sink::NoopSink;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl AnalysisBackend for Unreachable {
        async fn submit(
            &self,
            _document: &Document,
            _attributes: &PatientAttributes,
        ) -> Result<AnalysisReport, OperationFailure> {
            Err(OperationFailure::retryable("connection refused"))
        }

        async fn check_health(&self) -> Result<HealthReport, OperationFailure> {
            Err(OperationFailure::retryable("connection refused"))
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = ResilienceConfig::default();
        config.scheduler.max_failures = 0;
        let err = AnalysisService::new(
            Arc::new(Unreachable),
            ConnectivityGate::default(),
            config,
            Arc::new(NoopSink),
        )
        .unwrap_err();
        assert!(matches!(err, ResilienceError::InvalidConfiguration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_now_publishes_offline() {
        let service = AnalysisService::new(
            Arc::new(Unreachable),
            ConnectivityGate::default(),
            ResilienceConfig::default(),
            Arc::new(NoopSink),
        )
        .unwrap();

        let status = service.probe_now().await;
        assert_eq!(status.state, HealthState::Offline);
        assert_eq!(service.current_status(), status);
        assert!(service.scheduler().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_submission_rearms_scheduler() {
        let service = AnalysisService::new(
            Arc::new(Unreachable),
            ConnectivityGate::default(),
            ResilienceConfig::default(),
            Arc::new(NoopSink),
        )
        .unwrap();
        let document = Document::new("laudo.pdf", vec![1u8; 16]);
        let attributes = PatientAttributes {
            gender: Gender::Female,
            age: 34,
        };

        let err = service.run_submission(&document, &attributes).await.unwrap_err();
        assert_eq!(err.attempts(), Some(3));
        assert!(!service.scheduler().is_idle());

        // Health probe runs 3 attempts with 1s + 2s backoff
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(service.scheduler().consecutive_failures(), 1);
        assert!(service.scheduler().has_pending_timer());
        service.shutdown();
    }
}
