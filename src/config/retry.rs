use serde::{Deserialize, Serialize};

/// Backoff parameters for rate-limited upstream calls, managed by Figment.
///
/// Validated into a [`crate::upstream::RetryPolicy`] when the configuration is loaded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first call (must be >= 1).
    /// TOML: `retry.max_attempts`. Default: `3`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay before the first retry, in milliseconds (must be > 0).
    /// TOML: `retry.initial_delay_ms`. Default: `1000`.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Growth factor applied to the delay after each retry (must be > 1).
    /// TOML: `retry.backoff_multiplier`. Default: `2.0`.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_attempts() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f32 {
    2.0
}
