use crate::server::router::CastorState;
use axum::{Router, routing::post};

pub mod extract;
pub mod handlers;

pub fn router() -> Router<CastorState> {
    Router::new().route("/api/chat", post(handlers::chat_handler))
}
