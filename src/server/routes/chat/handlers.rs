use super::extract::ChatPreprocess;
use crate::error::GatewayError;
use crate::server::router::CastorState;
use axum::{Json, extract::State};
use castor_schema::ChatReply;

pub(super) async fn chat_handler(
    State(state): State<CastorState>,
    ChatPreprocess(body): ChatPreprocess,
) -> Result<Json<ChatReply>, GatewayError> {
    let response = state.invoker.invoke(&body.message).await?;
    Ok(Json(ChatReply { response }))
}
