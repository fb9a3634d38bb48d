//! Concurrent fan-out of one request to its engines.
//!
//! Every resolved engine runs as its own spawned unit inside a tracing span.
//! A unit owns its session for its whole lifetime and writes nothing but
//! its own outcome, so a slow, failing, or panicking engine cannot affect
//! the others. The request as a whole is bounded by the request timeout and
//! by the caller's cancellation token; whatever is still running when
//! either fires settles as [`EngineFailure::Timeout`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::reconcile::reconcile;
use crate::adapter::{AdapterRegistry, SourceAdapter};
use crate::challenge::{ChallengeMediator, MediationError};
use crate::config::SearchConfig;
use crate::error::AdapterError;
use crate::outcome::{EngineFailure, EngineOutcome, Outcomes, SearchResponse};
use crate::request::SearchRequest;
use crate::session::SessionManager;
use crate::types::{EngineId, Language, RawFinding, Region};

/// Dispatches requests to source adapters and reconciles their findings.
#[derive(Debug)]
pub struct Aggregator {
    config: Arc<SearchConfig>,
    registry: AdapterRegistry,
    sessions: Arc<SessionManager>,
    mediator: Arc<ChallengeMediator>,
}

impl Aggregator {
    /// Build an aggregator over `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SearchError::Config`] if `config` is invalid.
    pub fn new(
        config: SearchConfig,
        registry: AdapterRegistry,
        mediator: ChallengeMediator,
    ) -> crate::Result<Self> {
        config.validate()?;
        let sessions = SessionManager::new(&config);
        Ok(Self {
            config: Arc::new(config),
            registry,
            sessions: Arc::new(sessions),
            mediator: Arc::new(mediator),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn mediator(&self) -> &ChallengeMediator {
        &self.mediator
    }

    /// Dispatch `request` and reconcile the outcomes into a response.
    pub async fn search(&self, request: &SearchRequest, cancel: &CancellationToken) -> SearchResponse {
        let outcomes = self.run(request, cancel).await;
        let aggregated = reconcile(&outcomes);
        SearchResponse::new(request.query(), outcomes, aggregated)
    }

    /// Dispatch `request` to every selected engine and wait for all of them.
    ///
    /// Never fails: every engine in the request, known or not, gets exactly
    /// one outcome, in request order.
    pub async fn run(&self, request: &SearchRequest, cancel: &CancellationToken) -> Outcomes {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.request_timeout();

        // Cancelled on drop, so abandoning this future stops every unit.
        let request_cancel = cancel.child_token();
        let _stop_units = request_cancel.clone().drop_guard();

        // The deadline also ends human waits, which run outside `bounded`.
        let watchdog = {
            let expire = request_cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                tracing::debug!("request deadline reached; cancelling pending engines");
                expire.cancel();
            })
        };

        let units: Vec<_> = request
            .engines()
            .iter()
            .map(|name| {
                let handle = self.dispatch(name, request, deadline, &request_cancel);
                let name = name.clone();
                let query = request.query().to_string();
                async move {
                    let outcome = match handle {
                        None => EngineOutcome::failed(&name, &query, EngineFailure::UnsupportedEngine),
                        Some(handle) => handle.await.unwrap_or_else(|e| {
                            tracing::error!(engine = %name, error = %e, "engine unit panicked");
                            EngineOutcome::failed(
                                &name,
                                &query,
                                EngineFailure::Adapter("engine task panicked".into()),
                            )
                        }),
                    };
                    (name, outcome)
                }
            })
            .collect();

        let outcomes: Outcomes = futures::future::join_all(units).await.into_iter().collect();
        watchdog.abort();

        let succeeded = outcomes.iter().filter(|(_, o)| o.is_success()).count();
        tracing::info!(
            engines = outcomes.len(),
            succeeded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search dispatch complete"
        );
        outcomes
    }

    /// Spawn the unit for `name`, or `None` if no adapter is registered.
    fn dispatch(
        &self,
        name: &str,
        request: &SearchRequest,
        deadline: tokio::time::Instant,
        cancel: &CancellationToken,
    ) -> Option<tokio::task::JoinHandle<EngineOutcome>> {
        let Some((engine, adapter)) = self.registry.resolve(name) else {
            tracing::warn!(engine = name, "unsupported engine requested");
            return None;
        };

        let unit = EngineUnit {
            engine,
            adapter,
            sessions: Arc::clone(&self.sessions),
            mediator: Arc::clone(&self.mediator),
            query: request.query().to_string(),
            region: request.region(),
            language: request.language(),
            budget: self.config.engine_timeout(engine),
            deadline,
            cancel: cancel.clone(),
        };
        let span = tracing::info_span!("engine", engine = %engine);
        Some(tokio::spawn(unit.run().instrument(span)))
    }
}

/// Everything one engine's unit of work owns.
struct EngineUnit {
    engine: EngineId,
    adapter: Arc<dyn SourceAdapter>,
    sessions: Arc<SessionManager>,
    mediator: Arc<ChallengeMediator>,
    query: String,
    region: Region,
    language: Language,
    budget: Duration,
    deadline: tokio::time::Instant,
    cancel: CancellationToken,
}

impl EngineUnit {
    async fn run(self) -> EngineOutcome {
        let started = Instant::now();
        let name = self.engine.name();

        let result = self.fetch_with_mediation().await;
        let outcome = match result {
            Ok(findings) => EngineOutcome::from_findings(name, &self.query, findings),
            Err(failure) => EngineOutcome::failed(name, &self.query, failure),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome.failure() {
            None => tracing::info!(
                count = outcome.contribution().len(),
                elapsed_ms,
                "engine returned findings"
            ),
            Some(failure) => tracing::warn!(failure = %failure, elapsed_ms, "engine failed"),
        }
        outcome
    }

    async fn fetch_with_mediation(&self) -> Result<Vec<RawFinding>, EngineFailure> {
        let mut session = self
            .sessions
            .acquire(self.engine, self.region, self.language, self.budget)
            .map_err(|e| EngineFailure::Adapter(e.to_string()))?;

        let first = self
            .bounded(self.adapter.fetch(&self.query, self.region, self.language, &mut session))
            .await
            .ok_or(EngineFailure::Timeout)?;

        let signature = match first {
            Ok(findings) => return Ok(findings),
            Err(AdapterError::Challenge { signature }) => signature,
            Err(other) => return Err(EngineFailure::Adapter(other.to_string())),
        };

        if !self.adapter.supports_challenge_retry() {
            tracing::debug!(%signature, "challenge retry not supported");
            return Err(EngineFailure::ChallengeUnresolved);
        }

        // Human time is bounded by the mediator and the request, not the engine budget.
        match self.mediator.mediate(&mut session, &self.cancel).await {
            Ok(_) => {}
            Err(MediationError::Abandoned(reason)) => {
                tracing::debug!(%reason, "mediation abandoned");
                return Err(if self.past_deadline() {
                    EngineFailure::Timeout
                } else {
                    EngineFailure::ChallengeUnresolved
                });
            }
            Err(e) => return Err(EngineFailure::Adapter(e.to_string())),
        }

        let resumed = self
            .bounded(self.adapter.resume(&self.query, self.region, self.language, &mut session))
            .await
            .ok_or(EngineFailure::Timeout)?;

        match resumed {
            Ok(findings) => Ok(findings),
            Err(AdapterError::Challenge { .. }) => Err(EngineFailure::ChallengeUnresolved),
            Err(other) => Err(EngineFailure::Adapter(other.to_string())),
        }
    }

    /// Run `fut` within the engine budget, the request deadline and the
    /// cancellation token. `None` means one of them ran out first.
    async fn bounded<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        let until = (tokio::time::Instant::now() + self.budget).min(self.deadline);
        tokio::select! {
            out = fut => Some(out),
            () = tokio::time::sleep_until(until) => None,
            () = self.cancel.cancelled() => None,
        }
    }

    fn past_deadline(&self) -> bool {
        tokio::time::Instant::now() >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{ChallengeDesk, DeskOperator};
    use async_trait::async_trait;
    use crate::session::Session;

    struct Canned {
        engine: EngineId,
        findings: Vec<RawFinding>,
        delay: Duration,
    }

    #[async_trait]
    impl SourceAdapter for Canned {
        fn engine(&self) -> EngineId {
            self.engine
        }

        async fn fetch(
            &self,
            _query: &str,
            _region: Region,
            _language: Language,
            _session: &mut Session,
        ) -> Result<Vec<RawFinding>, AdapterError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.findings.clone())
        }
    }

    struct Failing(EngineId);

    #[async_trait]
    impl SourceAdapter for Failing {
        fn engine(&self) -> EngineId {
            self.0
        }

        async fn fetch(
            &self,
            _query: &str,
            _region: Region,
            _language: Language,
            _session: &mut Session,
        ) -> Result<Vec<RawFinding>, AdapterError> {
            Err(AdapterError::Navigation("connection reset".into()))
        }
    }

    fn config() -> SearchConfig {
        SearchConfig {
            timeout_seconds: 2,
            timeout_overrides: vec![],
            navigation_delay_ms: (0, 0),
            settle_delay_ms: (0, 0),
            ..Default::default()
        }
    }

    fn aggregator(config: SearchConfig, registry: AdapterRegistry) -> Aggregator {
        let mediator = ChallengeMediator::new(
            Arc::new(DeskOperator::new(ChallengeDesk::new())),
            Duration::from_secs(1),
        );
        Aggregator::new(config, registry, mediator).expect("valid config")
    }

    fn canned(engine: EngineId, urls: &[&str], delay: Duration) -> Arc<Canned> {
        Arc::new(Canned {
            engine,
            findings: urls
                .iter()
                .map(|u| RawFinding::new(format!("{engine} {u}"), *u, "d"))
                .collect(),
            delay,
        })
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SearchConfig {
            max_findings_per_engine: 0,
            ..Default::default()
        };
        let mediator = ChallengeMediator::new(Arc::new(DeskOperator::default()), Duration::from_secs(1));
        assert!(Aggregator::new(config, AdapterRegistry::new(), mediator).is_err());
    }

    #[tokio::test]
    async fn unknown_engines_are_reported_without_dispatch() {
        let agg = aggregator(config(), AdapterRegistry::new());
        let request = SearchRequest::new("q", ["altavista", "google"], Region::Global, Language::Auto)
            .expect("request");
        let outcomes = agg.run(&request, &CancellationToken::new()).await;
        assert_eq!(outcomes.len(), 2);
        for (_, outcome) in outcomes.iter() {
            assert_eq!(outcome.failure(), Some(&EngineFailure::UnsupportedEngine));
        }
        assert_eq!(agg.sessions().active(), 0);
    }

    #[tokio::test]
    async fn outcomes_follow_request_order_not_completion_order() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(canned(EngineId::Google, &["https://a.com"], Duration::from_millis(150)))
            .register(canned(EngineId::Bing, &["https://b.com"], Duration::ZERO));
        let agg = aggregator(config(), registry);

        let request = SearchRequest::new("q", ["google", "bing"], Region::Global, Language::Auto)
            .expect("request");
        let outcomes = agg.run(&request, &CancellationToken::new()).await;
        let order: Vec<&str> = outcomes.engines().collect();
        assert_eq!(order, vec!["google", "bing"]);
    }

    #[tokio::test]
    async fn adapter_error_is_isolated() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(Failing(EngineId::Bing)))
            .register(canned(EngineId::DuckDuckGo, &["https://a.com"], Duration::ZERO));
        let agg = aggregator(config(), registry);

        let request = SearchRequest::new("q", ["bing", "duckduckgo"], Region::Global, Language::Auto)
            .expect("request");
        let outcomes = agg.run(&request, &CancellationToken::new()).await;
        assert!(matches!(
            outcomes.get("bing").and_then(|o| o.failure()),
            Some(EngineFailure::Adapter(msg)) if msg.contains("connection reset")
        ));
        assert!(outcomes.get("duckduckgo").is_some_and(|o| o.is_success()));
    }

    #[tokio::test]
    async fn engine_budget_times_out_slow_engine() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(canned(EngineId::Yandex, &["https://slow.com"], Duration::from_secs(10)))
            .register(canned(EngineId::Bing, &["https://fast.com"], Duration::ZERO));
        let config = SearchConfig {
            timeout_seconds: 1,
            ..config()
        };
        let agg = aggregator(config, registry);

        let request = SearchRequest::new("q", ["yandex", "bing"], Region::Global, Language::Auto)
            .expect("request");
        let started = Instant::now();
        let outcomes = agg.run(&request, &CancellationToken::new()).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            outcomes.get("yandex").and_then(|o| o.failure()),
            Some(&EngineFailure::Timeout)
        );
        assert!(outcomes.get("bing").is_some_and(|o| o.is_success()));
        assert_eq!(agg.sessions().active(), 0);
    }

    #[tokio::test]
    async fn caller_cancellation_times_out_pending_units() {
        let mut registry = AdapterRegistry::new();
        registry.register(canned(EngineId::Google, &["https://a.com"], Duration::from_secs(10)));
        let agg = aggregator(config(), registry);

        let request = SearchRequest::new("q", ["google"], Region::Global, Language::Auto)
            .expect("request");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcomes = agg.run(&request, &cancel).await;
        assert_eq!(
            outcomes.get("google").and_then(|o| o.failure()),
            Some(&EngineFailure::Timeout)
        );
    }

    #[tokio::test]
    async fn search_reconciles_outcomes() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(canned(EngineId::Google, &["https://www.shared.com/", "https://g.com"], Duration::ZERO))
            .register(canned(EngineId::Bing, &["https://shared.com/?utm_source=bing"], Duration::ZERO));
        let agg = aggregator(config(), registry);

        let request = SearchRequest::new("q", ["google", "bing"], Region::Global, Language::Auto)
            .expect("request");
        let response = agg.search(&request, &CancellationToken::new()).await;
        assert_eq!(response.total_unique_results(), 2);
        assert_eq!(response.aggregated_results()[0].raw_score(), 2);
        assert_eq!(response.aggregated_results()[0].normalized_url(), "https://shared.com/");
    }
}
