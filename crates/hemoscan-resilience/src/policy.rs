//! Retry policies with deterministic exponential backoff
//!
//! A [`RetryPolicy`] is an immutable value object handed to the orchestrator
//! per call site. The delay before retry `k` (0-indexed over the gaps between
//! attempts) is `min(base_delay * backoff_multiplier^k, max_delay)`. No jitter
//! is applied, so schedules are reproducible in tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ResilienceError, ResilienceResult};

/// Retry configuration for a remote operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
    /// Optional cap on any single delay
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and base delay
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    /// Policy tuned for cheap, frequent health checks
    pub fn health_probe() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Some(Duration::from_secs(4)),
        }
    }

    /// Policy tuned for slow, user-triggered operations such as document submission
    pub fn long_running() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(3),
            backoff_multiplier: 2.0,
            max_delay: None,
        }
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the delay cap
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Check the policy invariants
    ///
    /// # Errors
    ///
    /// Returns [`ResilienceError::InvalidConfiguration`] when `max_attempts` is
    /// zero, the multiplier is below one (or not finite), or the cap is smaller
    /// than the base delay.
    pub fn validate(&self) -> ResilienceResult<()> {
        if self.max_attempts == 0 {
            return Err(ResilienceError::InvalidConfiguration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ResilienceError::InvalidConfiguration(format!(
                "backoff_multiplier must be >= 1, got {}",
                self.backoff_multiplier
            )));
        }
        if let Some(max) = self.max_delay
            && max < self.base_delay
        {
            return Err(ResilienceError::InvalidConfiguration(format!(
                "max_delay {max:?} is smaller than base_delay {:?}",
                self.base_delay
            )));
        }
        Ok(())
    }

    /// Delay inserted after failed attempt `attempt` (0-indexed) before the next one
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let raw = self.base_delay.as_secs_f64() * factor;

        // Saturate rather than panic on absurd exponents
        let uncapped = Duration::try_from_secs_f64(raw).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => uncapped.min(cap),
            None => uncapped,
        }
    }

    /// Whether another attempt is allowed after `attempts_made` attempts
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// The full backoff schedule between attempts
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|k| self.delay_for(k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_exponential_delays_are_deterministic() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_cap() {
        let policy = RetryPolicy::health_probe();
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(policy.delay_for(10), Duration::from_secs(4));
    }

    #[test]
    fn test_long_running_schedule() {
        let policy = RetryPolicy::long_running();
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_secs(3), Duration::from_secs(6)]
        );
    }

    #[test]
    fn test_huge_exponent_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1)).with_multiplier(10.0);
        assert_eq!(policy.delay_for(400), Duration::MAX);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(RetryPolicy::new(0, Duration::from_secs(1)).validate().is_err());
        assert!(
            RetryPolicy::default()
                .with_multiplier(0.5)
                .validate()
                .is_err()
        );
        assert!(
            RetryPolicy::new(3, Duration::from_secs(5))
                .with_max_delay(Duration::from_secs(1))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_allows_another() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        assert!(policy.allows_another(0));
        assert!(policy.allows_another(1));
        assert!(!policy.allows_another(2));
    }
}
