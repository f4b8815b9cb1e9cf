pub mod chat;
pub mod openai;

pub use chat::{ChatErrorReply, ChatReply, ChatRequest};
pub use openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole};
