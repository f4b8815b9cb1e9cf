use crate::error::ChatRejection;
use crate::upstream::UPSTREAM_BODY_PREVIEW_CHARS;
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use castor_schema::ChatRequest;
use tracing::debug;

pub(crate) struct ChatPreprocess(pub(crate) ChatRequest);

impl<S> FromRequest<S> for ChatPreprocess
where
    S: Send + Sync,
{
    type Rejection = ChatRejection;

    /// Deserialize the `/api/chat` body.
    ///
    /// The message is not validated or trimmed: an empty or missing `message` still reaches the
    /// upstream. Only bodies that are not a JSON object with a string `message` are rejected.
    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<ChatRequest>::from_request(req, &()).await?;

        debug!(
            message_chars = body.message.chars().count(),
            message = %format!("{:.len$}", body.message, len = UPSTREAM_BODY_PREVIEW_CHARS),
            "Received chat message"
        );

        Ok(Self(body))
    }
}
