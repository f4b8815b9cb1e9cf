mod chat;
mod config;

pub use chat::{BUSY_MESSAGE, CREDENTIAL_MESSAGE, ChatRejection, GatewayError};
pub use config::ConfigError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
