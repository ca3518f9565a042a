use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A backend call failed
    #[error(transparent)]
    Client(#[from] collector_client::CollectorClientError),

    /// Filesystem failure around completion records or export output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
