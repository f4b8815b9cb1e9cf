use castor_schema::ChatCompletionRequest;
use reqwest::StatusCode;

pub struct CompletionApi;

impl CompletionApi {
    pub fn build_completion_request(
        client: &reqwest::Client,
        completions_url: &url::Url,
        api_key: &str,
        body: &ChatCompletionRequest,
    ) -> Result<reqwest::Request, reqwest::Error> {
        client
            .post(completions_url.clone())
            .bearer_auth(api_key)
            .json(body)
            .build()
    }

    /// Raw failure text for a non-success response, in the vendor SDK's wording
    /// (`Error code: <status> - <body>`) so classification matches on the same markers.
    pub fn describe_status_failure(status: StatusCode, body: &str) -> String {
        format!("Error code: {} - {}", status.as_u16(), body.trim())
    }
}
