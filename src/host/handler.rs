//! Production host handler backed by a [`SearchService`].

use std::sync::Arc;

use async_trait::async_trait;
use quorum_search::{ChallengeEvent, EngineId};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{QuorumError, Result};
use crate::history::HistoryStore;
use crate::host::channel::{HostHandler, SearchParams};
use crate::service::SearchService;

/// Serves host commands from a search service.
#[derive(Debug, Clone)]
pub struct SearchHostHandler {
    service: Arc<SearchService>,
}

impl SearchHostHandler {
    pub fn new(service: Arc<SearchService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &SearchService {
        &self.service
    }

    fn history(&self) -> Result<&Arc<dyn HistoryStore>> {
        self.service
            .history()
            .ok_or_else(|| QuorumError::History("search history is disabled".to_owned()))
    }
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| QuorumError::Channel(format!("failed to serialize {what}: {e}")))
}

#[async_trait]
impl HostHandler for SearchHostHandler {
    async fn run_search(
        &self,
        params: SearchParams,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let defaults = self.service.defaults();
        let engines = params.engines.unwrap_or_else(|| defaults.engines.clone());
        let region = params.region.as_deref().unwrap_or(&defaults.region);
        let language = params.language.as_deref().unwrap_or(&defaults.language);

        let run = self
            .service
            .search(&params.query, &engines, region, language, cancel)
            .await?;
        to_json(&run, "search response")
    }

    fn list_history(&self) -> Result<serde_json::Value> {
        let searches = self.history()?.list()?;
        to_json(&searches, "history listing")
    }

    fn get_history(&self, id: Uuid) -> Result<serde_json::Value> {
        match self.history()?.get(id)? {
            Some(record) => to_json(&record, "search record"),
            None => Err(QuorumError::History(format!("search {id} not found"))),
        }
    }

    fn delete_history(&self, id: Uuid) -> Result<()> {
        self.history()?.delete(id)
    }

    fn resolve_challenge(&self, engine: EngineId) -> bool {
        self.service.desk().resolve(engine)
    }

    fn abandon_challenge(&self, engine: EngineId) -> bool {
        self.service.desk().abandon(engine)
    }

    fn challenge_events(&self) -> Option<broadcast::Receiver<ChallengeEvent>> {
        Some(self.service.subscribe_challenges())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HistoryBackend, QuorumConfig};

    fn handler(history: bool) -> SearchHostHandler {
        let mut config = QuorumConfig::default();
        config.history.enabled = history;
        config.history.store = HistoryBackend::Memory;
        config.session.navigation_delay = (0, 0).into();
        SearchHostHandler::new(Arc::new(SearchService::from_config(&config).expect("config")))
    }

    #[tokio::test]
    async fn search_is_saved_and_retrievable() {
        let handler = handler(true);
        let payload = handler
            .run_search(
                SearchParams {
                    query: "cats".into(),
                    engines: Some(vec!["altavista".into()]),
                    region: None,
                    language: None,
                },
                &CancellationToken::new(),
            )
            .await
            .expect("search");

        let id: Uuid = payload["searchId"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("search id");
        let listing = handler.list_history().expect("list");
        assert_eq!(listing[0]["id"], id.to_string());

        let record = handler.get_history(id).expect("get");
        assert_eq!(record["query"], "cats");
        assert_eq!(
            record["perEngineResults"]["altavista"]["failure"]["kind"],
            "unsupported_engine"
        );

        handler.delete_history(id).expect("delete");
        assert!(matches!(handler.get_history(id), Err(QuorumError::History(_))));
    }

    #[test]
    fn disabled_history_is_an_error() {
        let handler = handler(false);
        assert!(matches!(handler.list_history(), Err(QuorumError::History(_))));
    }

    #[test]
    fn nothing_to_resolve_without_pending_challenge() {
        let handler = handler(true);
        assert!(!handler.resolve_challenge(EngineId::Google));
        assert!(!handler.abandon_challenge(EngineId::Bing));
    }
}
