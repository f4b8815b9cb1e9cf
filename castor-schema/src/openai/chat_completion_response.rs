//! OpenAI-compatible chat completion response schema.
//!
//! Upstream shape drift degrades to an empty reply instead of a decode failure. Only a body that is
//! not JSON at all fails to parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const FIRST_CONTENT_POINTER: &str = "/choices/0/message/content";

/// Completion body kept as raw JSON.
///
/// Only the first choice's content is ever read, so nothing else is decoded with a fixed type.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ChatCompletionResponse {
    body: Value,
}

impl ChatCompletionResponse {
    /// Content of the first choice, or an empty string when any part of the path is absent or
    /// has an unexpected type.
    pub fn first_content(&self) -> String {
        self.body
            .pointer(FIRST_CONTENT_POINTER)
            .map(content_text)
            .unwrap_or_default()
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    }
}
