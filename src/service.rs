//! The inbound search boundary.
//!
//! [`SearchService`] validates a request, dispatches it through the
//! aggregator, hands the result to the history store, and returns the
//! response together with the id it was saved under.

use std::sync::Arc;

use quorum_search::{
    AdapterRegistry, Aggregator, ChallengeDesk, ChallengeEvent, ChallengeMediator, SearchRequest,
    SearchResponse,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::QuorumConfig;
use crate::error::Result;
use crate::history::HistoryStore;

/// A completed search as returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRun {
    /// History id, if the search was persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<Uuid>,
    #[serde(flatten)]
    pub response: SearchResponse,
}

/// Engines, region and language used when a caller leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDefaults {
    pub engines: Vec<String>,
    pub region: String,
    pub language: String,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        let section = crate::config::SearchSection::default();
        Self {
            engines: section.default_engines,
            region: section.default_region,
            language: section.default_language,
        }
    }
}

/// Search entry point shared by the host bridge and embedders.
pub struct SearchService {
    aggregator: Arc<Aggregator>,
    history: Option<Arc<dyn HistoryStore>>,
    desk: ChallengeDesk,
    defaults: SearchDefaults,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("aggregator", &self.aggregator)
            .field("history", &self.history.is_some())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl SearchService {
    /// Assemble a service from its parts.
    ///
    /// `desk` must be the desk the aggregator's mediator hands challenges
    /// to, if it uses one.
    pub fn new(
        aggregator: Aggregator,
        history: Option<Arc<dyn HistoryStore>>,
        desk: ChallengeDesk,
    ) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            history,
            desk,
            defaults: SearchDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: SearchDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the service the configuration describes, with the HTML
    /// adapter for every engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the history
    /// database cannot be opened.
    pub fn from_config(config: &QuorumConfig) -> Result<Self> {
        config.validate()?;
        let search = config.search_config()?;
        let desk = ChallengeDesk::new();
        let mediator = ChallengeMediator::from_config(config.operator(&desk), &search);
        let registry = AdapterRegistry::with_html_engines(&search);
        let aggregator = Aggregator::new(search, registry, mediator)?;

        let history = crate::history::open_store(&config.history)?;

        tracing::info!(
            engines = aggregator.registry().len(),
            operator = ?config.challenge.operator,
            history = ?config.history.enabled.then_some(config.history.store),
            "search service ready"
        );

        Ok(Self::new(aggregator, history, desk).with_defaults(SearchDefaults {
            engines: config.search.default_engines.clone(),
            region: config.search.default_region.clone(),
            language: config.search.default_language.clone(),
        }))
    }

    /// Run one search.
    ///
    /// Region and language fall back to `global` / `auto` when unknown.
    /// Persistence failures are logged and leave `search_id` empty; they
    /// never fail the search.
    ///
    /// # Errors
    ///
    /// Returns [`quorum_search::SearchError::InvalidRequest`] (wrapped) for
    /// a blank query or an empty engine list.
    pub async fn search<S: AsRef<str>>(
        &self,
        query: &str,
        engines: &[S],
        region: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<SearchRun> {
        let request = SearchRequest::from_parts(query, engines, region, language)?;
        tracing::trace!(query = request.query(), "search received");

        let outcomes = self.aggregator.run(&request, cancel).await;
        let aggregated = quorum_search::orchestrator::reconcile(&outcomes);

        let search_id = match &self.history {
            Some(history) => match history.save(&request, &outcomes, &aggregated) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to persist search");
                    None
                }
            },
            None => None,
        };

        Ok(SearchRun {
            search_id,
            response: SearchResponse::new(request.query(), outcomes, aggregated),
        })
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn history(&self) -> Option<&Arc<dyn HistoryStore>> {
        self.history.as_ref()
    }

    pub fn desk(&self) -> &ChallengeDesk {
        &self.desk
    }

    pub fn defaults(&self) -> &SearchDefaults {
        &self.defaults
    }

    /// Challenge state changes from every search from now on.
    pub fn subscribe_challenges(&self) -> broadcast::Receiver<ChallengeEvent> {
        self.aggregator.mediator().subscribe()
    }
}
