//! Quorum: multi-engine web search ranked by cross-engine agreement.
//!
//! This crate wraps the `quorum-search` core with everything needed to run
//! it as a service:
//!
//! - **Configuration**: a TOML file mapped onto the core's `SearchConfig`
//! - **Search service**: the inbound `search` boundary, which persists every
//!   completed search to a history store
//! - **History**: SQLite and in-memory stores for past searches
//! - **Host bridge**: versioned JSON envelopes over stdin/stdout, including
//!   human challenge resolution and forwarded challenge events

pub mod config;
pub mod error;
pub mod history;
pub mod host;
pub mod quorum_dirs;
pub mod service;

pub use config::QuorumConfig;
pub use error::{QuorumError, Result};
pub use history::{HistoryStore, MemoryHistory, SearchRecord, SearchSummary, SqliteHistory};
pub use service::{SearchDefaults, SearchRun, SearchService};
