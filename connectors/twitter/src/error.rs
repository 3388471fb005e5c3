//! Error types for the stream, rule sync and reply paths.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the Twitter client and the reply pipeline.
#[derive(Error, Debug)]
pub enum TwitterError {
    /// A required startup parameter is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-level failure on any call
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single object on the stream could not be decoded.
    #[error("Decode error: {source} (line: {line})")]
    Decode {
        source: serde_json::Error,
        line: String,
    },

    /// Unexpected HTTP status on a one-shot call
    #[error("Twitter API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The server refused one or more filter rules.
    #[error("Rule rejected: {0}")]
    RuleRejected(String),

    /// The stream could not be opened or reported an error object.
    #[error("Stream error: {0}")]
    Stream(String),

    /// A stream line grew past the configured limit without a newline.
    #[error("Stream line of {size} bytes exceeds limit of {limit}")]
    BufferOverflow { size: usize, limit: usize },

    /// OAuth signature generation failed
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// An auxiliary call did not finish within its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl TwitterError {
    /// HTTP status attached to this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this error came from the stream decode loop.
    #[must_use]
    pub const fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Stream(_) | Self::BufferOverflow { .. }
        )
    }
}

/// Result type for Twitter operations.
pub type TwitterResult<T> = Result<T, TwitterError>;
