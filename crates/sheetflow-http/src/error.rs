//! Transport errors and secret redaction

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Failures below the HTTP status line. A non-2xx answer is not an error
/// at this layer.
#[derive(Error, Debug)]
pub enum HttpError {
    /// DNS, TCP or TLS failure before a response arrived
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Body was not valid UTF-8
    #[error("Response body error: {0}")]
    Body(String),

    /// Body could not be encoded or decoded as JSON
    #[error("JSON error: {0}")]
    Json(String),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type HttpResult<T> = Result<T, HttpError>;

/// Replace credentials that remote error bodies or transport errors may
/// echo back: user info in URLs, bearer headers, and OAuth token or secret
/// fields in both `key=value` and JSON form.
pub fn redact_secrets(msg: &str) -> String {
    static URL_USERINFO: OnceLock<Regex> = OnceLock::new();
    static JSON_SECRET: OnceLock<Regex> = OnceLock::new();
    static INLINE_SECRET: OnceLock<Regex> = OnceLock::new();

    let url_userinfo = URL_USERINFO
        .get_or_init(|| Regex::new(r"(https?://)[^@:/\s]+:[^@\s]+@").expect("valid regex"));
    let json_secret = JSON_SECRET.get_or_init(|| {
        Regex::new(r#"(?i)"(access_token|refresh_token|client_secret|private_key)"\s*:\s*"[^"]*""#)
            .expect("valid regex")
    });
    let inline_secret = INLINE_SECRET.get_or_init(|| {
        Regex::new(r#"(?i)\b(bearer|access_token|refresh_token|client_secret)(\s*[:=]\s*|\s+)[^\s&,"]+"#)
            .expect("valid regex")
    });

    let redacted = url_userinfo.replace_all(msg, "${1}[REDACTED]@");
    let redacted = json_secret.replace_all(&redacted, r#""$1": "[REDACTED]""#);
    inline_secret
        .replace_all(&redacted, "${1}${2}[REDACTED]")
        .into_owned()
}
