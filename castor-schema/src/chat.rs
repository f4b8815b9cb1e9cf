//! Inbound `/api/chat` envelope.

use serde::{Deserialize, Serialize};

/// Body accepted by the chat endpoint.
///
/// `message` is forwarded verbatim; a missing field is treated as an empty message.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Successful reply: `{ "response": "..." }`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
}

/// Failure reply: `{ "error": "..." }`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatErrorReply {
    pub error: String,
}

impl ChatErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
