use serde::Serialize;

pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty_json.as_str());
}

/// Renders a credential for logs: a short prefix plus its length, never the full value.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "<none>".to_string(),
        Some(secret) => {
            let prefix: String = secret.chars().take(4).collect();
            format!("{prefix}... (length: {})", secret.chars().count())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mask_secret;

    #[test]
    fn mask_secret_keeps_only_prefix() {
        assert_eq!(mask_secret(None), "<none>");
        assert_eq!(mask_secret(Some("sk-1234567890")), "sk-1... (length: 13)");
        assert_eq!(mask_secret(Some("ab")), "ab... (length: 2)");
    }
}
