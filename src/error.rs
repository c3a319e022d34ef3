//! Error types for wallpaper generation.

use std::time::Duration;

/// Longest provider error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while generating or handling wallpapers.
#[derive(Debug, thiserror::Error)]
pub enum WallGenError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the service, if any.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service answered, but not with anything usable.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Key selection through the host capability failed.
    #[error("credential selection failed: {0}")]
    Credential(String),

    /// No wallpaper with the given identifier or position.
    #[error("wallpaper not found: {0}")]
    NotFound(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving a download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for wallpaper generation operations.
pub type Result<T> = std::result::Result<T, WallGenError>;

/// Reads a `Retry-After` header given in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Redacts anything that looks like a Google API key and caps the length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_inclusive(|c: char| c.is_whitespace() || c == '"' || c == '=' || c == '&')
        .map(|token| {
            let word = token.trim_end_matches(|c: char| {
                c.is_whitespace() || c == '"' || c == '=' || c == '&'
            });
            if word.starts_with("AIza") && word.len() >= 30 {
                token.replacen(word, "[REDACTED]", 1)
            } else {
                token.to_string()
            }
        })
        .collect();
    let joined = redacted.concat();
    let trimmed = joined.trim();

    if trimmed.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let cut: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}
