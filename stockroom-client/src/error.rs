//! Error types for the provider and cache layers
//!
//! Every failure surfaces to the caller as one of these kinds. Nothing is
//! retried automatically; a lookup miss during a scan is `None`, not an error.

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Client error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// A provider operation was called before `initialize`
    #[error("{0} provider not initialized")]
    NotInitialized(String),

    /// The backend answered but reported failure or a malformed payload.
    /// Carries the backend message verbatim.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Network failure or timeout before a response envelope was obtained
    #[error("Transport error: {0}")]
    Transport(String),

    /// Caller-side precondition failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider identifier not in the registry catalog
    #[error("Unknown provider type: {0}")]
    UnknownProvider(String),

    /// Local cache (SQLite) failure
    #[error(transparent)]
    Cache(#[from] stockroom_common::Error),
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::Cache(stockroom_common::Error::Database(err))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Transport(format!("request timed out: {}", err))
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}
