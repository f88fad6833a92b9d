//! Error taxonomy for the fetch/classify/aggregate pipeline.
//!
//! Per-ticket classification failures are caught and counted by the batch
//! runner; everything else propagates to the caller. `anyhow` wraps these at
//! the CLI boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing credentials. Terminal for the current fetch or call.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-2xx response, carrying the status and a truncated body.
    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport-level failure reaching the remote endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Model output contained no extractable, valid JSON.
    #[error("could not parse model output: {0}")]
    Parse(String),

    /// A response matched none of the known content shapes.
    #[error("unrecognized response shape: {0}")]
    Shape(String),

    /// A classification batch is already running against this store.
    #[error("a classification batch is already in progress")]
    BatchInProgress,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

/// Truncate a string for error messages (Unicode-safe).
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = Error::Http {
            status: 500,
            body: "internal error".to_string(),
        };
        assert_eq!(err.to_string(), "API error 500: internal error");
    }

    #[test]
    fn test_truncate_str_short_input_untouched() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_str_cuts_at_char_boundary() {
        let s = "héllo wörld";
        let truncated = truncate_str(s, 4);
        assert_eq!(truncated, "héll");
    }
}
