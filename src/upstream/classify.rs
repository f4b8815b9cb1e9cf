//! Failure classification by upstream error wording.
//!
//! The upstream only exposes its error kind through free text, so classification is a
//! case-insensitive substring match. The marker tables below are the only place to touch when the
//! vendor changes its wording.

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "error code: 429",
];

const CREDENTIAL_MARKERS: &[&str] = &[
    "api key",
    "api_key",
    "apikey",
    "unauthorized",
    "authentication",
    "error code: 401",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retry after a delay.
    RateLimited,
    /// Missing or rejected credential.
    Credential,
    Other,
}

/// Rate limiting wins over credential markers when both appear.
pub fn classify_failure(raw_message: &str) -> FailureClass {
    let lower = raw_message.to_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|marker| lower.contains(marker));

    if contains_any(RATE_LIMIT_MARKERS) {
        FailureClass::RateLimited
    } else if contains_any(CREDENTIAL_MARKERS) {
        FailureClass::Credential
    } else {
        FailureClass::Other
    }
}
