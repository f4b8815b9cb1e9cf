//! Resilient call layer for the upstream chat-completion endpoint.

mod api;
mod classify;
mod client;
mod http;
mod invoker;
mod policy;

pub use api::CompletionApi;
pub use classify::{FailureClass, classify_failure};
pub use client::{CompletionClient, HttpCompletionClient};
pub use http::{CASTOR_USER_AGENT, build_http_client};
pub use invoker::{ResilientInvoker, retry_transient};
pub use policy::RetryPolicy;

use crate::error::IsRetryable;

pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

/// Normalized result of exactly one upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Success { content: String },
    /// Retry is sanctioned (rate limited).
    TransientFailure { raw_message: String },
    /// Stop immediately.
    FatalFailure { raw_message: String },
}

impl CompletionOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        CompletionOutcome::Success {
            content: content.into(),
        }
    }

    /// Classifies a raw failure description into a transient or fatal outcome.
    pub fn from_failure(raw_message: impl Into<String>) -> Self {
        let raw_message = raw_message.into();
        match classify_failure(&raw_message) {
            FailureClass::RateLimited => CompletionOutcome::TransientFailure { raw_message },
            FailureClass::Credential | FailureClass::Other => {
                CompletionOutcome::FatalFailure { raw_message }
            }
        }
    }
}

impl IsRetryable for CompletionOutcome {
    fn is_retryable(&self) -> bool {
        matches!(self, CompletionOutcome::TransientFailure { .. })
    }
}
