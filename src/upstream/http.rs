use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use std::time::Duration;

use crate::config::UpstreamConfig;

pub const CASTOR_USER_AGENT: &str = concat!("castor/", env!("CARGO_PKG_VERSION"));

/// Builds the shared reqwest client used for every upstream call.
pub fn build_http_client(cfg: &UpstreamConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();

    let mut builder = reqwest::Client::builder()
        .user_agent(CASTOR_USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.request_timeout_secs));

    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if cfg.enable_multiplexing {
        builder = builder.http2_adaptive_window(true);
    } else {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    builder.default_headers(headers).build()
}
