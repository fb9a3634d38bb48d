//! Error types for the quorum-search crate.
//!
//! Only [`SearchError::InvalidRequest`] ever aborts a search as a whole.
//! Everything that goes wrong inside a single engine is captured as an
//! [`EngineFailure`](crate::outcome::EngineFailure) instead, and adapters
//! report their own problems through [`AdapterError`].

/// Errors surfaced by the public search API and its supporting services.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request was rejected before dispatch (empty query or engine set).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A browsing session could not be created or driven.
    #[error("session error: {0}")]
    Session(String),
}

/// Convenience type alias for quorum-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Failure raised by a source adapter while fetching findings.
///
/// Adapters must fail by returning one of these rather than a sentinel
/// finding list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The page is gated behind an anti-automation challenge.
    #[error("challenge detected ({signature})")]
    Challenge {
        /// Which detection heuristic matched.
        signature: String,
    },

    /// Navigation to the engine failed (network, HTTP status, redirects).
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The page loaded but findings could not be extracted.
    #[error("extraction failed: {0}")]
    Extraction(String),
}

impl From<SearchError> for AdapterError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Parse(msg) => Self::Extraction(msg),
            other => Self::Navigation(other.to_string()),
        }
    }
}
