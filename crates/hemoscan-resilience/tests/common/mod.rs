//! Common test utilities for integration tests
//!
//! Provides a scripted in-memory backend so scheduler and service behavior can
//! be driven deterministically under a paused tokio clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hemoscan_resilience::{
    AnalysisBackend, AnalysisReport, AnalysisService, ConnectivityGate, Document, Gender,
    HealthReport, LabFinding, OperationFailure, PatientAttributes, ResilienceConfig, RetryPolicy,
    RingBufferSink,
};
use parking_lot::Mutex;

/// How one health check should behave
#[derive(Debug, Clone)]
pub enum HealthScript {
    /// Respond healthy after the given latency
    Healthy(Duration),
    /// Fail with a retryable error
    Down,
}

/// Backend whose responses are queued up front
#[derive(Debug)]
pub struct ScriptedBackend {
    health: Mutex<VecDeque<HealthScript>>,
    health_fallback: Mutex<HealthScript>,
    submissions: Mutex<VecDeque<Result<AnalysisReport, OperationFailure>>>,
    pub health_calls: AtomicU32,
    pub submit_calls: AtomicU32,
}

impl ScriptedBackend {
    /// A backend whose health check always fails
    pub fn down() -> Arc<Self> {
        Self::with_fallback(HealthScript::Down)
    }

    /// A backend whose health check always succeeds instantly
    pub fn healthy() -> Arc<Self> {
        Self::with_fallback(HealthScript::Healthy(Duration::ZERO))
    }

    fn with_fallback(fallback: HealthScript) -> Arc<Self> {
        Arc::new(Self {
            health: Mutex::new(VecDeque::new()),
            health_fallback: Mutex::new(fallback),
            submissions: Mutex::new(VecDeque::new()),
            health_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
        })
    }

    /// Queue health responses, consumed before the fallback
    pub fn queue_health(&self, scripts: impl IntoIterator<Item = HealthScript>) {
        self.health.lock().extend(scripts);
    }

    /// Change the response used once the queue is empty
    pub fn set_health(&self, script: HealthScript) {
        *self.health_fallback.lock() = script;
    }

    /// Queue submission results; an empty queue yields an empty report
    pub fn queue_submissions(
        &self,
        results: impl IntoIterator<Item = Result<AnalysisReport, OperationFailure>>,
    ) {
        self.submissions.lock().extend(results);
    }

    pub fn health_calls(&self) -> u32 {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn submit(
        &self,
        _document: &Document,
        _attributes: &PatientAttributes,
    ) -> Result<AnalysisReport, OperationFailure> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.submissions.lock().pop_front();
        next.unwrap_or_else(|| Ok(AnalysisReport::default()))
    }

    async fn check_health(&self) -> Result<HealthReport, OperationFailure> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let script = {
            let queued = self.health.lock().pop_front();
            queued.unwrap_or_else(|| self.health_fallback.lock().clone())
        };
        match script {
            HealthScript::Healthy(latency) => {
                tokio::time::sleep(latency).await;
                Ok(HealthReport {
                    status: "healthy".to_string(),
                    message: "API funcionando corretamente".to_string(),
                })
            }
            HealthScript::Down => Err(OperationFailure::retryable("connection refused")),
        }
    }
}

/// Config with single-attempt probes so scheduler timing is easy to follow
pub fn fast_probe_config() -> ResilienceConfig {
    ResilienceConfig {
        health_policy: RetryPolicy::new(1, Duration::from_millis(100)),
        ..ResilienceConfig::default()
    }
}

pub fn service(
    backend: Arc<ScriptedBackend>,
    config: ResilienceConfig,
) -> (AnalysisService, Arc<RingBufferSink>) {
    let sink = Arc::new(RingBufferSink::default());
    let service = AnalysisService::new(backend, ConnectivityGate::new(true), config, sink.clone())
        .expect("valid config");
    (service, sink)
}

pub fn sample_document() -> Document {
    Document::new("hemograma.pdf", b"%PDF-1.4 sample".to_vec())
}

pub fn sample_attributes() -> PatientAttributes {
    PatientAttributes {
        gender: Gender::Male,
        age: 52,
    }
}

pub fn sample_report() -> AnalysisReport {
    AnalysisReport {
        lab_findings: vec![LabFinding {
            analyte: "Hemoglobina".to_string(),
            value: 11.2,
            result: "baixo".to_string(),
            severity: 2,
            specialty: "Hematologia".to_string(),
            description: "Anemia leve".to_string(),
            guideline: "OMS".to_string(),
        }],
        recommended_specialties: vec!["Hematologia".to_string()],
        patient_briefing: "Procure um hematologista.".to_string(),
    }
}
