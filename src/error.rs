//! Error types for the quorum host.

use quorum_search::SearchError;

/// Top-level error type for the quorum service and host bridge.
#[derive(Debug, thiserror::Error)]
pub enum QuorumError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the search core (only rejected requests and bad config).
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Search history storage error.
    #[error("history error: {0}")]
    History(String),

    /// Search history database error.
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A host command was malformed or could not be carried out.
    #[error("command error: {0}")]
    Command(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, QuorumError>;
