mod basic;
mod prompt;
mod retry;
mod upstream;

pub use basic::BasicConfig;
pub use prompt::SYSTEM_PROMPT;
pub use retry::RetryConfig;
pub use upstream::UpstreamConfig;

use crate::error::ConfigError;
use crate::upstream::RetryPolicy;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
///
/// Built once in `main` and handed to the components that need it; nothing reads the process
/// environment after startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Upstream completion endpoint (see `upstream` table in config.toml).
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Backoff for rate-limited calls (see `retry` table in config.toml).
    #[serde(default)]
    pub retry: RetryConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Legacy variable name the credential has always been read from.
const API_KEY_ENV: &str = "SAMBANOVA_API_KEY";

/// Prefix for per-key overrides, e.g. `CASTOR_RETRY__MAX_ATTEMPTS=5`.
const ENV_PREFIX: &str = "CASTOR_";

impl Config {
    /// Builds a Figment that merges defaults, an optional `config.toml`, then the environment.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        };
        Self::with_env(figment)
    }

    fn with_env(figment: Figment) -> Figment {
        figment
            .merge(
                Env::raw()
                    .only(&[API_KEY_ENV])
                    .map(|_| "upstream.api_key".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extracts and validates a configuration from any Figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let cfg: Self = figment.extract().map_err(Box::new)?;
        cfg.retry_policy()?;
        cfg.upstream.completions_url()?;
        Ok(cfg)
    }

    /// Loads `.env`, then defaults + `config.toml` (if present) + environment, and validates.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_figment(&Self::figment())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::try_from(&self.retry)
    }
}
