//! Subscriber installation
//!
//! Provides the [`TelemetryGuard`] for managing the logging lifecycle.

use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{
    Layer, Registry, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{LogFormat, TelemetryConfig, TelemetryError, TelemetryResult};

/// Guard that marks the logging lifetime
///
/// Keep it alive for as long as the program logs; dropping it records the
/// shutdown.
///
/// ```rust,ignore
/// let _telemetry = TelemetryConfig::default().init()?;
/// run().await?;
/// // Guard dropped here
/// ```
pub struct TelemetryGuard {
    config: TelemetryConfig,
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("config", &self.config)
            .finish()
    }
}

impl TelemetryGuard {
    /// Initialize logging with the provided configuration
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfiguration`] for a bad filter, or
    /// [`TelemetryError::TracingError`] if a global subscriber already exists.
    pub fn init(config: TelemetryConfig) -> TelemetryResult<Self> {
        init_subscriber(&config)?;

        info!(
            service_name = %config.service_name,
            service_version = %config.service_version,
            format = %config.format,
            "hemoscan telemetry initialized"
        );

        Ok(Self { config })
    }

    /// Get the service name
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        info!(
            service_name = %self.config.service_name,
            "Shutting down hemoscan telemetry"
        );
    }
}

/// Build the filter from `RUST_LOG`, falling back to the configured level
pub(crate) fn env_filter(config: &TelemetryConfig) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::InvalidConfiguration(format!("Invalid log level: {e}")))
}

fn init_subscriber(config: &TelemetryConfig) -> TelemetryResult<()> {
    let filter = env_filter(config)?;

    let writer = if config.stderr_output {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_ansi(config.ansi)
            .with_target(true)
            .pretty()
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(writer)
            .with_ansi(config.ansi)
            .with_target(false)
            .compact()
            .boxed(),
    };

    Registry::default()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::TracingError(e.to_string()))
}
