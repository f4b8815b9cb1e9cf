use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

/// Upstream chat-completion endpoint configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API; `/chat/completions` is appended.
    /// TOML: `upstream.base_url`. Default: `https://api.sambanova.ai/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Bearer credential for the upstream API.
    /// TOML: `upstream.api_key`. Env: `SAMBANOVA_API_KEY`.
    /// Blank values are treated as unset; requests then fail before any network call.
    #[serde(default, deserialize_with = "deserialize_secret_lax")]
    pub api_key: Option<String>,

    /// Model identifier sent with every completion.
    /// TOML: `upstream.model`. Default: `Llama-3.2-90B-Vision-Instruct`.
    #[serde(default = "default_model")]
    pub model: String,

    /// TOML: `upstream.temperature`. Default: `0.1`.
    #[serde(default = "default_sampling")]
    pub temperature: f32,

    /// Nucleus-sampling mass.
    /// TOML: `upstream.top_p`. Default: `0.1`.
    #[serde(default = "default_sampling")]
    pub top_p: f32,

    /// Optional upstream HTTP proxy. If set, used for the reqwest client.
    /// TOML: `upstream.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for the reqwest client; disabled forces HTTP/1.
    /// TOML: `upstream.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,

    /// TOML: `upstream.connect_timeout_secs`. Default: `10`.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout, including reading the body.
    /// TOML: `upstream.request_timeout_secs`. Default: `600`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl UpstreamConfig {
    /// The configured credential, if it is present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// `{base_url}/chat/completions`, tolerating a trailing slash on the base.
    pub fn completions_url(&self) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("chat/completions")
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_sampling(),
            top_p: default_sampling(),
            proxy: None,
            enable_multiplexing: false,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// Env values that look numeric are parsed as numbers by Figment.
fn deserialize_secret_lax<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;

    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom(
            "expected a string or a number for upstream.api_key",
        )),
    }
}

fn default_base_url() -> Url {
    Url::parse("https://api.sambanova.ai/v1").expect("valid default upstream base URL")
}

fn default_model() -> String {
    "Llama-3.2-90B-Vision-Instruct".to_string()
}

fn default_sampling() -> f32 {
    0.1
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credential_counts_as_missing() {
        let mut cfg = UpstreamConfig::default();
        assert_eq!(cfg.credential(), None);

        cfg.api_key = Some("   ".to_string());
        assert_eq!(cfg.credential(), None);

        cfg.api_key = Some(" sk-test ".to_string());
        assert_eq!(cfg.credential(), Some("sk-test"));
    }

    #[test]
    fn completions_url_appends_path_with_or_without_trailing_slash() {
        let mut cfg = UpstreamConfig::default();
        assert_eq!(
            cfg.completions_url().expect("join").as_str(),
            "https://api.sambanova.ai/v1/chat/completions"
        );

        cfg.base_url = Url::parse("http://127.0.0.1:9000/v1/").expect("url");
        assert_eq!(
            cfg.completions_url().expect("join").as_str(),
            "http://127.0.0.1:9000/v1/chat/completions"
        );

        cfg.base_url = Url::parse("http://127.0.0.1:9000").expect("url");
        assert_eq!(
            cfg.completions_url().expect("join").as_str(),
            "http://127.0.0.1:9000/chat/completions"
        );
    }
}
