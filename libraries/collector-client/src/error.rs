//! Error types for the Playlist Collector client.

use thiserror::Error;

/// Errors that can occur when interacting with the Playlist Collector backend.
#[derive(Error, Debug)]
pub enum CollectorClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Session expired or credential invalid (401)
    #[error("Session expired. Please log in again.")]
    AuthExpired,

    /// Rate limited by the backend (429), with an optional reset-time hint
    /// from the error body
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        reset_time: Option<String>,
    },

    /// Invalid backend URL
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse a server response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// Locally detected invalid input; no request was sent
    #[error("{0}")]
    Validation(String),

    /// IO error while persisting credentials or export bytes
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectorClientError {
    /// Human-readable rate-limit message including the reset hint when the
    /// backend provided one.
    pub fn rate_limit_hint(&self) -> Option<String> {
        match self {
            CollectorClientError::RateLimited {
                message,
                reset_time,
            } => Some(match reset_time {
                Some(reset) => format!("{message}. {reset}"),
                None => format!("{message}. Try again later."),
            }),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, CollectorClientError>;
