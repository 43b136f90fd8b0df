//! # hemoscan HTTP transport
//!
//! reqwest-based implementation of
//! [`AnalysisBackend`](hemoscan_resilience::AnalysisBackend) for the lab-report
//! analysis service.
//!
//! ## Features
//!
//! - **Document submission**: `POST /interpret` as multipart (`file`, `genero`, `idade`)
//! - **Liveness**: `GET /health`, ready only when the service says `"healthy"`
//! - **Boundary classification**: every failure becomes a Retryable or Fatal
//!   [`OperationFailure`](hemoscan_resilience::OperationFailure) exactly once
//! - **Per-operation timeouts**: short for probes, long for submissions
//! - **Reachability monitor**: TCP connect polling that feeds a
//!   [`ConnectivityGate`](hemoscan_resilience::ConnectivityGate)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hemoscan_http::{HttpBackend, HttpBackendConfig};
//! use hemoscan_resilience::{AnalysisService, ConnectivityGate, ResilienceConfig, TracingSink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpBackend::new(HttpBackendConfig::new("http://localhost:8000"))?;
//! let service = AnalysisService::new(
//!     Arc::new(backend),
//!     ConnectivityGate::default(),
//!     ResilienceConfig::default(),
//!     Arc::new(TracingSink),
//! )?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod backend;
mod config;
mod error;
mod reachability;

pub mod classify;

pub use backend::{HEALTHY, HttpBackend};
pub use config::{HttpBackendConfig, ReachabilityConfig};
pub use error::{HttpError, HttpResult};
pub use reachability::ReachabilityMonitor;
