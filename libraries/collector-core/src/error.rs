/// Core error types for Playlist Collector
use thiserror::Error;

/// Result type alias using `CollectorError`
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Core error type for Playlist Collector
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Locally detected invalid input (empty selection, empty URL, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown export format string
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CollectorError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
