pub mod config;
pub mod error;
pub mod server;
pub mod upstream;
pub mod utils;

pub use error::{ConfigError, GatewayError};
pub use upstream::{CompletionClient, CompletionOutcome, ResilientInvoker, RetryPolicy};
