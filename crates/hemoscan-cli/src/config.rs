//! Layered CLI configuration
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file, then
//! `HEMOSCAN_*` environment variables. Command-line flags are applied on top
//! by [`CliConfig::apply_overrides`]. Nested keys use a double underscore in
//! the environment, e.g. `HEMOSCAN_SUBMISSION__MAX_ATTEMPTS=5`.
//!
//! ```toml
//! base_url = "http://lab.example:8000"
//! submission_timeout_ms = 120000
//!
//! [submission]
//! max_attempts = 4
//! base_delay_ms = 2000
//!
//! [scheduler]
//! max_failures = 8
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use hemoscan_http::{HttpBackendConfig, ReachabilityConfig};
use hemoscan_resilience::{ResilienceConfig, RetryPolicy, SchedulerConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliResult;

const ENV_PREFIX: &str = "HEMOSCAN";

/// Retry policy as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Attempts including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Growth factor between retries
    pub backoff_multiplier: f64,
    /// Cap on a single delay
    pub max_delay_ms: Option<u64>,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self::from(&RetryPolicy::default())
    }
}

impl From<&RetryPolicy> for PolicySection {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: millis(policy.base_delay),
            backoff_multiplier: policy.backoff_multiplier,
            max_delay_ms: policy.max_delay.map(millis),
        }
    }
}

impl PolicySection {
    /// Convert to a [`RetryPolicy`]
    pub fn to_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_multiplier(self.backoff_multiplier);
        match self.max_delay_ms {
            Some(ms) => policy.with_max_delay(Duration::from_millis(ms)),
            None => policy,
        }
    }
}

/// Reconnect scheduler settings as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Fixed part of the reschedule delay
    pub base_delay_ms: u64,
    /// Added per consecutive failure
    pub step_delay_ms: u64,
    /// Failures before auto-checking stops
    pub max_failures: u32,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            base_delay_ms: millis(defaults.base_delay),
            step_delay_ms: millis(defaults.step_delay),
            max_failures: defaults.max_failures,
        }
    }
}

/// Complete CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Analysis service base URL
    pub base_url: String,
    /// Log filter directives when `RUST_LOG` is unset
    pub log_level: String,
    /// HTTP timeout for health checks
    pub probe_timeout_ms: u64,
    /// HTTP timeout for submissions
    pub submission_timeout_ms: u64,
    /// Bound on each wait for connectivity
    pub connectivity_wait_ms: u64,
    /// Latency above which the service counts as slow
    pub slow_threshold_ms: u64,
    /// Interval between TCP reachability checks in `watch`
    pub reachability_interval_ms: u64,
    /// Health check retry policy
    pub health: PolicySection,
    /// Submission retry policy
    pub submission: PolicySection,
    /// Reconnect scheduler
    pub scheduler: SchedulerSection,
}

impl Default for CliConfig {
    fn default() -> Self {
        let http = HttpBackendConfig::default();
        let resilience = ResilienceConfig::default();
        Self {
            base_url: http.base_url,
            log_level: "warn".to_string(),
            probe_timeout_ms: millis(http.probe_timeout),
            submission_timeout_ms: millis(http.submission_timeout),
            connectivity_wait_ms: millis(resilience.connectivity_wait),
            slow_threshold_ms: millis(resilience.slow_threshold),
            reachability_interval_ms: millis(ReachabilityConfig::default().interval),
            health: PolicySection::from(&resilience.health_policy),
            submission: PolicySection::from(&resilience.submission_policy),
            scheduler: SchedulerSection::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from `path` (or the default location) and the
    /// process environment
    ///
    /// An explicit path must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns a config error when a file cannot be read or a value has the
    /// wrong type.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        Self::load_from(path, None)
    }

    /// Like [`load`](Self::load), with an explicit environment map in place of
    /// the process environment
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_from(
        path: Option<&Path>,
        environment: Option<HashMap<String, String>>,
    ) -> CliResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            None => {
                if let Some(path) = default_path() {
                    debug!(path = %path.display(), "Looking for default config file");
                    builder =
                        builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(environment),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, url: Option<&str>, verbose: bool) {
        if let Some(url) = url {
            self.base_url = url.to_string();
        }
        if verbose {
            self.log_level = "debug".to_string();
        }
    }

    /// HTTP transport settings
    pub fn http(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            submission_timeout: Duration::from_millis(self.submission_timeout_ms),
            ..HttpBackendConfig::new(self.base_url.clone())
        }
    }

    /// Resilience layer settings
    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            health_policy: self.health.to_policy(),
            submission_policy: self.submission.to_policy(),
            connectivity_wait: Duration::from_millis(self.connectivity_wait_ms),
            slow_threshold: Duration::from_millis(self.slow_threshold_ms),
            scheduler: SchedulerConfig {
                base_delay: Duration::from_millis(self.scheduler.base_delay_ms),
                step_delay: Duration::from_millis(self.scheduler.step_delay_ms),
                max_failures: self.scheduler.max_failures,
            },
        }
    }

    /// Reachability monitor settings
    pub fn reachability(&self) -> ReachabilityConfig {
        ReachabilityConfig {
            interval: Duration::from_millis(self.reachability_interval_ms),
            ..ReachabilityConfig::default()
        }
    }
}

/// `<config dir>/hemoscan/config.toml`, when the platform has a config dir
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hemoscan").join("config.toml"))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_library_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.resilience(), ResilienceConfig::default());
        assert_eq!(config.http().base_url, HttpBackendConfig::default().base_url);
        assert_eq!(config.reachability(), ReachabilityConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_config(
            r#"
            base_url = "http://lab.example:9000"
            submission_timeout_ms = 60000

            [submission]
            max_attempts = 5
            base_delay_ms = 500

            [scheduler]
            max_failures = 8
            "#,
        );

        let config = CliConfig::load_from(Some(file.path()), Some(HashMap::new())).unwrap();
        assert_eq!(config.base_url, "http://lab.example:9000");
        assert_eq!(config.http().submission_timeout, Duration::from_secs(60));

        let resilience = config.resilience();
        assert_eq!(resilience.submission_policy.max_attempts, 5);
        assert_eq!(resilience.submission_policy.base_delay, Duration::from_millis(500));
        assert_eq!(resilience.scheduler.max_failures, 8);
        // Untouched keys keep their preset values
        assert_eq!(resilience.submission_policy.max_delay, None);
        assert_eq!(resilience.health_policy, RetryPolicy::health_probe());
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config(r#"base_url = "http://from-file:8000""#);
        let env = HashMap::from([
            ("HEMOSCAN_BASE_URL".to_string(), "http://from-env:8000".to_string()),
            ("HEMOSCAN_HEALTH__MAX_ATTEMPTS".to_string(), "6".to_string()),
        ]);

        let config = CliConfig::load_from(Some(file.path()), Some(env)).unwrap();
        assert_eq!(config.base_url, "http://from-env:8000");
        assert_eq!(config.health.max_attempts, 6);
        assert_eq!(config.health.max_delay_ms, Some(4000));
    }

    #[test]
    fn flags_override_everything() {
        let mut config = CliConfig::default();
        config.apply_overrides(Some("http://flag:1234"), true);
        assert_eq!(config.base_url, "http://flag:1234");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = CliConfig::load_from(
            Some(Path::new("/nonexistent/hemoscan/config.toml")),
            Some(HashMap::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn uncapped_policy_round_trips() {
        let policy = RetryPolicy::long_running();
        assert_eq!(PolicySection::from(&policy).to_policy(), policy);
    }
}
