use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::ConfigError;

/// Immutable backoff policy for rate-limited calls.
///
/// `max_attempts` counts every call, the first one included, so at most `max_attempts - 1`
/// delays are ever taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: usize,
    initial_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: usize,
        initial_delay: Duration,
        backoff_multiplier: f32,
    ) -> Result<Self, ConfigError> {
        if max_attempts < 1 {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "max_attempts must be at least 1, got {max_attempts}"
            )));
        }
        if initial_delay.is_zero() {
            return Err(ConfigError::InvalidRetryPolicy(
                "initial_delay must be greater than zero".to_string(),
            ));
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier <= 1.0 {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "backoff_multiplier must be a finite number greater than 1, got {backoff_multiplier}"
            )));
        }

        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        })
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_multiplier(&self) -> f32 {
        self.backoff_multiplier
    }

    /// Delay taken before retry `k` (1-based): `initial_delay * multiplier^(k-1)`.
    pub fn delay_before_retry(&self, k: usize) -> Duration {
        let exponent = i32::try_from(k.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs =
            self.initial_delay.as_secs_f64() * f64::from(self.backoff_multiplier).powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Exponential schedule without jitter; the cap equals the last scheduled delay so it never
    /// reshapes the sequence.
    pub fn backoff(&self) -> ExponentialBuilder {
        let retries = self.max_attempts - 1;
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_factor(self.backoff_multiplier)
            .with_max_delay(self.delay_before_retry(retries.max(1)))
            .with_max_times(retries)
    }

    /// The delays taken between attempts, in order.
    pub fn delays(&self) -> ExponentialBackoff {
        self.backoff().build()
    }

    /// Upper bound on the total time spent sleeping for one invocation.
    pub fn worst_case_delay(&self) -> Duration {
        (1..self.max_attempts)
            .map(|k| self.delay_before_retry(k))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = ConfigError;

    fn try_from(cfg: &RetryConfig) -> Result<Self, Self::Error> {
        RetryPolicy::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.initial_delay_ms),
            cfg.backoff_multiplier,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_one_then_two_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(policy.worst_case_delay(), Duration::from_secs(3));
    }

    #[test]
    fn single_attempt_never_sleeps() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1), 2.0).expect("policy");
        assert_eq!(policy.delays().count(), 0);
        assert_eq!(policy.worst_case_delay(), Duration::ZERO);
    }

    #[test]
    fn kth_delay_grows_geometrically() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250), 2.0).expect("policy");
        let delays: Vec<Duration> = policy.delays().collect();
        let expected: Vec<Duration> = (1..5).map(|k| policy.delay_before_retry(k)).collect();
        assert_eq!(
            expected,
            vec![
                Duration::from_millis(250),
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
            ]
        );
        assert_eq!(delays, expected);
    }

    #[test]
    fn worst_case_matches_geometric_sum() {
        // initial * (m^(n-1) - 1) / (m - 1) with initial=1s, m=4, n=4 => 21s.
        let policy = RetryPolicy::new(4, Duration::from_secs(1), 4.0).expect("policy");
        assert_eq!(policy.worst_case_delay(), Duration::from_secs(21));
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(RetryPolicy::new(0, Duration::from_secs(1), 2.0).is_err());
        assert!(RetryPolicy::new(3, Duration::ZERO, 2.0).is_err());
        assert!(RetryPolicy::new(3, Duration::from_secs(1), 1.0).is_err());
        assert!(RetryPolicy::new(3, Duration::from_secs(1), f32::NAN).is_err());
    }
}
