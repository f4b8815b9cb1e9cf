use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use castor_schema::ChatErrorReply;
use thiserror::Error as ThisError;

use crate::upstream::{FailureClass, UPSTREAM_BODY_PREVIEW_CHARS, classify_failure};

pub const BUSY_MESSAGE: &str = "The server is busy. Please try again later.";
pub const CREDENTIAL_MESSAGE: &str =
    "API key configuration error. Please check your environment variables.";

/// Terminal outcome of a chat invocation, already classified for the caller.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum GatewayError {
    /// Upstream kept rate limiting until the attempt budget ran out.
    #[error("Upstream still rate limited after retries: {raw_message}")]
    Busy { raw_message: String },

    /// No credential configured; the upstream was never contacted.
    #[error("Upstream credential is not configured")]
    MissingCredential,

    #[error("Upstream rejected the credential: {raw_message}")]
    CredentialRejected { raw_message: String },

    /// Any other fatal upstream failure.
    #[error("Upstream error: {raw_message}")]
    Upstream { raw_message: String },
}

impl GatewayError {
    /// Splits a non-retryable failure into credential problems and everything else.
    pub fn from_fatal(raw_message: String) -> Self {
        match classify_failure(&raw_message) {
            FailureClass::Credential => GatewayError::CredentialRejected { raw_message },
            FailureClass::RateLimited | FailureClass::Other => {
                GatewayError::Upstream { raw_message }
            }
        }
    }

    /// Text returned in the `error` field.
    ///
    /// Rate limiting and credential problems get fixed notices; other failures are rare and
    /// surface the raw upstream text.
    pub fn client_message(&self) -> &str {
        match self {
            GatewayError::Busy { .. } => BUSY_MESSAGE,
            GatewayError::MissingCredential | GatewayError::CredentialRejected { .. } => {
                CREDENTIAL_MESSAGE
            }
            GatewayError::Upstream { raw_message } => raw_message,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::Busy { raw_message } => tracing::warn!(
                raw = %format!("{:.len$}", raw_message, len = UPSTREAM_BODY_PREVIEW_CHARS),
                "Chat failed: upstream busy"
            ),
            GatewayError::MissingCredential => {
                tracing::error!("Chat failed: upstream credential is not configured");
            }
            GatewayError::CredentialRejected { raw_message } => tracing::error!(
                raw = %format!("{:.len$}", raw_message, len = UPSTREAM_BODY_PREVIEW_CHARS),
                "Chat failed: upstream rejected credential"
            ),
            GatewayError::Upstream { raw_message } => tracing::error!(
                raw = %format!("{:.len$}", raw_message, len = UPSTREAM_BODY_PREVIEW_CHARS),
                "Chat failed: upstream error"
            ),
        }

        let body = ChatErrorReply::new(self.client_message());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Inbound body could not be turned into a chat request.
#[derive(Debug, ThisError)]
#[error("Request rejected: {message}")]
pub struct ChatRejection {
    pub status: StatusCode,
    pub message: &'static str,
    pub debug_message: String,
}

impl From<JsonRejection> for ChatRejection {
    fn from(rejection: JsonRejection) -> Self {
        let debug_message = rejection.to_string();
        match rejection {
            JsonRejection::BytesRejection(_) => ChatRejection {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "failed to read request body",
                debug_message,
            },
            JsonRejection::MissingJsonContentType(_) => ChatRejection {
                status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                message: "expected application/json body",
                debug_message,
            },
            _ => ChatRejection {
                status: StatusCode::BAD_REQUEST,
                message: "invalid JSON body",
                debug_message,
            },
        }
    }
}

impl IntoResponse for ChatRejection {
    fn into_response(self) -> Response {
        tracing::warn!(
            status = %self.status,
            message = %self.message,
            debug_message = %self.debug_message,
            "Chat request rejected"
        );
        (self.status, Json(ChatErrorReply::new(self.message))).into_response()
    }
}
