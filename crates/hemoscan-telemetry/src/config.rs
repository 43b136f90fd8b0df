//! Telemetry configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, with file and line numbers
    #[default]
    Json,
    /// Multi-line human-readable output
    Pretty,
    /// Single-line human-readable output
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
            Self::Compact => f.write_str("compact"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(TelemetryError::InvalidConfiguration(format!(
                "unknown log format '{other}', expected json, pretty or compact"
            ))),
        }
    }
}

/// Telemetry configuration
///
/// Use [`TelemetryConfigBuilder`] for ergonomic configuration construction.
///
/// # Example
///
/// ```rust
/// use hemoscan_telemetry::{LogFormat, TelemetryConfig};
///
/// let config = TelemetryConfig::builder()
///     .service_name("hemoscan")
///     .log_level("info,hemoscan=debug")
///     .format(LogFormat::Compact)
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name recorded at startup
    pub service_name: String,
    /// Service version recorded at startup
    pub service_version: String,
    /// Filter directives used when `RUST_LOG` is unset
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
    /// Write to stderr instead of stdout
    pub stderr_output: bool,
    /// Emit ANSI colors in human-readable formats
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "hemoscan".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info,hemoscan=debug".to_string(),
            format: LogFormat::Json,
            stderr_output: true,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    /// Install the global subscriber
    ///
    /// Returns a guard that logs shutdown on drop.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfiguration`] for a bad filter, or
    /// [`TelemetryError::TracingError`] if a global subscriber already exists.
    pub fn init(self) -> Result<crate::TelemetryGuard, TelemetryError> {
        crate::TelemetryGuard::init(self)
    }
}

/// Builder for [`TelemetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    log_level: Option<String>,
    format: Option<LogFormat>,
    stderr_output: Option<bool>,
    ansi: Option<bool>,
}

impl TelemetryConfigBuilder {
    /// Set the service name
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the service version
    #[must_use]
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Set the log level filter
    ///
    /// Examples: "info", "debug", "warn,hemoscan_resilience=debug"
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Set the output format
    #[must_use]
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Enable or disable stderr output
    #[must_use]
    pub fn stderr_output(mut self, enabled: bool) -> Self {
        self.stderr_output = Some(enabled);
        self
    }

    /// Enable or disable ANSI colors
    #[must_use]
    pub fn ansi(mut self, enabled: bool) -> Self {
        self.ansi = Some(enabled);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();

        TelemetryConfig {
            service_name: self.service_name.unwrap_or(defaults.service_name),
            service_version: self.service_version.unwrap_or(defaults.service_version),
            log_level: self.log_level.unwrap_or(defaults.log_level),
            format: self.format.unwrap_or(defaults.format),
            stderr_output: self.stderr_output.unwrap_or(defaults.stderr_output),
            ansi: self.ansi.unwrap_or(defaults.ansi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "hemoscan");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.stderr_output);
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::builder()
            .service_name("hemoscan-cli")
            .log_level("debug")
            .format(LogFormat::Pretty)
            .ansi(false)
            .build();

        assert_eq!(config.service_name, "hemoscan-cli");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.ansi);
        assert!(config.stderr_output);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_deserializes_partially() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{"format": "compact", "log_level": "warn"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.service_name, "hemoscan");
    }
}
