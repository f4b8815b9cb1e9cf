use async_trait::async_trait;
use castor_schema::{ChatCompletionRequest, ChatCompletionResponse};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::api::CompletionApi;
use super::{CompletionOutcome, UPSTREAM_BODY_PREVIEW_CHARS};
use crate::config::{SYSTEM_PROMPT, UpstreamConfig};
use crate::utils::logging::with_pretty_json_debug;

/// One upstream call, normalized into a [`CompletionOutcome`].
///
/// Implementations never retry; that is the invoker's job.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, user_message: &str) -> CompletionOutcome;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    completions_url: Url,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    top_p: f32,
    system_prompt: Arc<str>,
}

impl HttpCompletionClient {
    pub fn new(cfg: &UpstreamConfig, client: reqwest::Client) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            completions_url: cfg.completions_url()?,
            api_key: cfg.credential().map(str::to_string),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            system_prompt: Arc::from(SYSTEM_PROMPT),
        })
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<Arc<str>>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_body(&self, user_message: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::with_system_prompt(
            self.model.as_str(),
            &self.system_prompt,
            user_message,
        )
        .sampling(self.temperature, self.top_p)
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, user_message: &str) -> CompletionOutcome {
        debug!(
            model = %self.model,
            user_message = %format!("{:.len$}", user_message, len = UPSTREAM_BODY_PREVIEW_CHARS),
            "Outgoing completion request"
        );

        let Some(api_key) = self.api_key.as_deref() else {
            return CompletionOutcome::from_failure("API key not found in configuration");
        };

        let body = self.build_body(user_message);
        let request = match CompletionApi::build_completion_request(
            &self.client,
            &self.completions_url,
            api_key,
            &body,
        ) {
            Ok(request) => request,
            Err(e) => return CompletionOutcome::from_failure(e.to_string()),
        };

        let resp = match self.client.execute(request).await {
            Ok(resp) => resp,
            Err(e) => {
                let outcome = CompletionOutcome::from_failure(e.to_string());
                debug!(error = %e, ?outcome, "Upstream transport error");
                return outcome;
            }
        };

        let status = resp.status();
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                let outcome = CompletionOutcome::from_failure(format!(
                    "Failed to read upstream response body: {e}"
                ));
                debug!(%status, error = %e, ?outcome, "Upstream body read error");
                return outcome;
            }
        };

        if !status.is_success() {
            let raw_body = String::from_utf8_lossy(&bytes);
            let outcome = CompletionOutcome::from_failure(CompletionApi::describe_status_failure(
                status, &raw_body,
            ));
            debug!(
                %status,
                body = %format!("{:.len$}", raw_body, len = UPSTREAM_BODY_PREVIEW_CHARS),
                transient = matches!(outcome, CompletionOutcome::TransientFailure { .. }),
                "Upstream error response"
            );
            return outcome;
        }

        match serde_json::from_slice::<ChatCompletionResponse>(&bytes) {
            Ok(parsed) => {
                with_pretty_json_debug(&parsed, |pretty| {
                    debug!(%status, body = %pretty, "Upstream completion response");
                });
                CompletionOutcome::success(parsed.first_content())
            }
            Err(e) => {
                let raw_body = String::from_utf8_lossy(&bytes);
                debug!(
                    %status,
                    error = %e,
                    body = %format!("{:.len$}", raw_body, len = UPSTREAM_BODY_PREVIEW_CHARS),
                    "Upstream completion response is not JSON"
                );
                CompletionOutcome::FatalFailure {
                    raw_message: format!("Failed to decode upstream completion response: {e}"),
                }
            }
        }
    }
}
