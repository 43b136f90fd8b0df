//! # hemoscan telemetry
//!
//! `tracing` subscriber setup shared by hemoscan binaries.
//!
//! - [`TelemetryConfig`] / [`TelemetryConfigBuilder`]: service identity, filter
//!   directives, output format and destination
//! - [`TelemetryGuard`]: installs the global subscriber and logs shutdown on drop
//!
//! `RUST_LOG`, when set, overrides [`TelemetryConfig::log_level`].
//!
//! ```rust,no_run
//! use hemoscan_telemetry::{LogFormat, TelemetryConfig};
//!
//! # fn main() -> Result<(), hemoscan_telemetry::TelemetryError> {
//! let _guard = TelemetryConfig::builder()
//!     .log_level("warn,hemoscan_resilience=info")
//!     .format(LogFormat::Compact)
//!     .build()
//!     .init()?;
//!
//! tracing::info!("ready");
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

mod config;
mod error;
mod init;

pub use config::{LogFormat, TelemetryConfig, TelemetryConfigBuilder};
pub use error::{TelemetryError, TelemetryResult};
pub use init::TelemetryGuard;

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, trace, warn};
