//! Log Redaction
//!
//! Scrubs API keys and access tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

/// Google API keys (Gemini) and OpenAI-style secret keys.
static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{30,}|sk-[A-Za-z0-9_\-]{20,}").unwrap());

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[A-Za-z0-9\-\._~+/]+=*").unwrap());

/// OAuth access tokens as issued by Google.
static GOOGLE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ya29\.[0-9A-Za-z_\-\.]+").unwrap());

/// `key=` / `access_token=` query parameters in request URLs.
static QUERY_SECRET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([?&](?:key|api_key|access_token)=)[^&\s]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = QUERY_SECRET_RE.replace_all(input, "${1}[REDACTED]");
    let redacted = BEARER_RE.replace_all(&redacted, "Bearer [REDACTED_TOKEN]");
    let redacted = GOOGLE_TOKEN_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    API_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_bearer_and_oauth_tokens() {
        let raw = "403 for Bearer ya29.a0AfH6SMBx-token_value";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("ya29"));
        assert!(clean.contains("Bearer [REDACTED_TOKEN]"));
    }

    #[test]
    fn scrubs_api_keys() {
        let raw = "gemini key AIzaSyA1234567890abcdefghijklmnopqrstu and sk-proj-abcdefghijklmnopqrstuvwx";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("AIzaSy"));
        assert!(!clean.contains("sk-proj"));
    }

    #[test]
    fn scrubs_query_parameters() {
        let clean = redact_sensitive_data("GET https://host/v1?alt=json&key=abc123 failed");
        assert_eq!(clean, "GET https://host/v1?alt=json&key=[REDACTED] failed");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let raw = "row 4: image download failed: 404";
        assert_eq!(redact_sensitive_data(raw), raw);
    }
}
