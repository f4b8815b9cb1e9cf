use thiserror::Error as ThisError;

/// Startup failures; the binary reports these and exits before binding.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("invalid upstream base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}
