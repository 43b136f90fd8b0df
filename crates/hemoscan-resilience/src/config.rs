//! Configuration for the resilience layer

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ResilienceError, ResilienceResult};
use crate::policy::RetryPolicy;
use crate::retry::CONNECTIVITY_WAIT;
use crate::status::SLOW_THRESHOLD;

/// Reconnect scheduler tuning
///
/// The delay before the next automatic check grows linearly:
/// `base_delay + consecutive_failures * step_delay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fixed part of the reschedule delay
    pub base_delay: Duration,
    /// Added once per consecutive failure
    pub step_delay: Duration,
    /// Consecutive failures after which auto-probing stops
    pub max_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            step_delay: Duration::from_secs(2),
            max_failures: 5,
        }
    }
}

impl SchedulerConfig {
    /// Delay before the next check after `consecutive_failures` failures
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        self.step_delay
            .saturating_mul(consecutive_failures)
            .saturating_add(self.base_delay)
    }
}

/// Complete resilience configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Policy for health probes
    pub health_policy: RetryPolicy,
    /// Policy for document submission
    pub submission_policy: RetryPolicy,
    /// Bound on each connectivity wait inside the orchestrator
    pub connectivity_wait: Duration,
    /// Probe latency above which the backend counts as slow
    pub slow_threshold: Duration,
    /// Reconnect scheduler tuning
    pub scheduler: SchedulerConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            health_policy: RetryPolicy::health_probe(),
            submission_policy: RetryPolicy::long_running(),
            connectivity_wait: CONNECTIVITY_WAIT,
            slow_threshold: SLOW_THRESHOLD,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ResilienceConfig {
    /// Validate every nested value
    ///
    /// # Errors
    ///
    /// Returns [`ResilienceError::InvalidConfiguration`] naming the first
    /// offending field.
    pub fn validate(&self) -> ResilienceResult<()> {
        self.health_policy
            .validate()
            .map_err(|e| prefixed("health_policy", e))?;
        self.submission_policy
            .validate()
            .map_err(|e| prefixed("submission_policy", e))?;

        if self.connectivity_wait.is_zero() {
            return Err(ResilienceError::InvalidConfiguration(
                "connectivity_wait must be greater than zero".to_string(),
            ));
        }
        if self.slow_threshold.is_zero() {
            return Err(ResilienceError::InvalidConfiguration(
                "slow_threshold must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.max_failures == 0 {
            return Err(ResilienceError::InvalidConfiguration(
                "scheduler.max_failures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn prefixed(field: &str, error: ResilienceError) -> ResilienceError {
    match error {
        ResilienceError::InvalidConfiguration(detail) => {
            ResilienceError::InvalidConfiguration(format!("{field}: {detail}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ResilienceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connectivity_wait, Duration::from_secs(5));
        assert_eq!(config.scheduler.max_failures, 5);
    }

    #[test]
    fn reschedule_delay_grows_linearly() {
        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.delay_after(0), Duration::from_secs(5));
        assert_eq!(scheduler.delay_after(1), Duration::from_secs(7));
        assert_eq!(scheduler.delay_after(4), Duration::from_secs(13));
    }

    #[test]
    fn nested_policy_errors_name_the_field() {
        let config = ResilienceConfig {
            submission_policy: RetryPolicy::new(0, Duration::from_secs(1)),
            ..ResilienceConfig::default()
        };
        match config.validate() {
            Err(ResilienceError::InvalidConfiguration(detail)) => {
                assert!(detail.starts_with("submission_policy:"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ResilienceConfig = serde_json::from_str(
            r#"{"scheduler": {"base_delay": {"secs": 1, "nanos": 0}, "step_delay": {"secs": 1, "nanos": 0}, "max_failures": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.scheduler.max_failures, 2);
        assert_eq!(config.health_policy, RetryPolicy::health_probe());
    }
}
