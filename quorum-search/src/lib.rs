//! # quorum-search
//!
//! Multi-engine web search aggregation.
//!
//! A query is sent to several public search engines at once. Their results
//! are merged by normalised URL and ranked by how many engines agree on
//! each one. Every upstream is treated as unreliable: markup changes,
//! timeouts, and bot-detection challenges are captured per engine and never
//! fail the request as a whole.
//!
//! ## Design
//!
//! - One spawned unit per engine, each with its own isolated [`Session`]
//!   and time budget; a request-level deadline and cancellation token bound
//!   everything
//! - Failed engines settle into typed [`EngineFailure`]s with placeholder
//!   findings, so every requested engine always has an outcome
//! - Challenges are detected after every navigation and escalated to a
//!   human through the [`ChallengeMediator`], then extraction resumes
//! - Reconciliation is a pure function over the outcomes in request order
//!
//! ## Security
//!
//! - No network listeners: this is a library
//! - Search queries are logged only at trace level
//!
//! [`Session`]: session::Session
//! [`EngineFailure`]: outcome::EngineFailure
//! [`ChallengeMediator`]: challenge::ChallengeMediator

pub mod adapter;
pub mod challenge;
pub mod config;
pub mod engines;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod request;
pub mod session;
pub mod types;

pub use adapter::{AdapterRegistry, SourceAdapter};
pub use challenge::{ChallengeDesk, ChallengeEvent, ChallengeMediator, ChallengeState};
pub use config::SearchConfig;
pub use error::{AdapterError, Result, SearchError};
pub use orchestrator::Aggregator;
pub use outcome::{EngineFailure, EngineOutcome, Outcomes, SearchResponse};
pub use request::SearchRequest;
pub use types::{AggregatedResult, EngineId, Language, RawFinding, Region};

use tokio_util::sync::CancellationToken;

/// Search `engines` for `query` through `aggregator`.
///
/// Region and language strings are parsed leniently: unknown values fall
/// back to `global` and `auto`. Unknown engine names are reported as
/// per-engine failures in the response.
///
/// # Errors
///
/// Returns [`SearchError::InvalidRequest`] if the query is blank or no
/// engine was given. Nothing that happens inside an engine is an error.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> quorum_search::Result<()> {
/// use std::sync::Arc;
/// use quorum_search::challenge::DeskOperator;
/// use quorum_search::{AdapterRegistry, Aggregator, ChallengeMediator, SearchConfig};
/// use tokio_util::sync::CancellationToken;
///
/// let config = SearchConfig::default();
/// let registry = AdapterRegistry::with_html_engines(&config);
/// let mediator = ChallengeMediator::from_config(Arc::new(DeskOperator::default()), &config);
/// let aggregator = Aggregator::new(config, registry, mediator)?;
///
/// let response = quorum_search::search(
///     &aggregator,
///     "rust programming",
///     &["duckduckgo", "bing"],
///     "global",
///     "auto",
///     &CancellationToken::new(),
/// )
/// .await?;
/// for result in response.aggregated_results() {
///     println!("{} ({}): {}", result.title(), result.score(), result.url());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search<S: AsRef<str>>(
    aggregator: &Aggregator,
    query: &str,
    engines: &[S],
    region: &str,
    language: &str,
    cancel: &CancellationToken,
) -> Result<SearchResponse> {
    let request = SearchRequest::from_parts(query, engines, region, language)?;
    tracing::trace!(query = request.query(), engines = ?request.engines(), "search requested");
    Ok(aggregator.search(&request, cancel).await)
}
