//! Resilient remote-operation layer for the hemoscan analysis client
//!
//! This crate decides whether, when, and how to retry calls to the remote
//! lab-report analysis service, classifies the service's health, and keeps
//! that classification fresh while the user waits.
//!
//! - **Connectivity Gate**: is the transport usable, and wait until it is
//! - **Retry Orchestrator**: bounded, deterministic exponential backoff
//! - **Health Probe**: cheap liveness check with latency
//! - **Status Classifier**: probe outcome to checking / online / slow / offline
//! - **Reconnect Scheduler**: self-rescheduling re-check loop with a failure cap
//! - **Analysis Service**: the facade a user interface talks to
//!
//! The transport is abstracted behind [`AnalysisBackend`]; `hemoscan-http`
//! provides the HTTP implementation.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hemoscan_resilience::{
//!     AnalysisService, ConnectivityGate, ResilienceConfig, TracingSink,
//! };
//!
//! let service = AnalysisService::new(
//!     backend,
//!     ConnectivityGate::default(),
//!     ResilienceConfig::default(),
//!     Arc::new(TracingSink),
//! )?;
//!
//! let _subscription = service.on_status_change(|status| {
//!     println!("{}: {}", status.state, status.message);
//! });
//! service.start_monitoring();
//!
//! match service.run_submission(&document, &attributes).await {
//!     Ok(report) => render(report),
//!     Err(err) => eprintln!("{}", err.user_message()),
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backend;
pub mod board;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod policy;
pub mod probe;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod sink;
pub mod status;

// Re-exports
pub use backend::{
    AnalysisBackend, AnalysisReport, Document, Gender, HealthReport, LabFinding, PatientAttributes,
};
pub use board::{StatusBoard, StatusSubscription};
pub use config::{ResilienceConfig, SchedulerConfig};
pub use connectivity::ConnectivityGate;
pub use error::{
    CONNECTIVITY_MESSAGE, FailureClass, OperationFailure, ResilienceError, ResilienceResult,
};
pub use policy::RetryPolicy;
pub use probe::{HealthProbe, PROBE_TIMEOUT, ProbeOutcome, ProbeSuccess};
pub use retry::{CONNECTIVITY_WAIT, RetryOrchestrator};
pub use scheduler::ReconnectScheduler;
pub use service::AnalysisService;
pub use sink::{
    EventSink, FanoutSink, NoopSink, RecordedEvent, ResilienceEvent, RingBufferSink, SharedSink,
    TracingSink,
};
pub use status::{HealthState, HealthStatus, SLOW_THRESHOLD, StatusClassifier};

pub use tokio_util::sync::CancellationToken;
