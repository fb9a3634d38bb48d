//! Search service against mock engine pages.
//!
//! Two engines are served by a local mock server with overlapping results,
//! so the full path runs: dispatch, extraction, reconciliation, history.

use std::sync::Arc;

use quorum::history::HistoryStore;
use quorum::{MemoryHistory, QuorumError, SearchService};
use quorum_search::challenge::DeskOperator;
use quorum_search::engines::{self, HtmlAdapter};
use quorum_search::{
    AdapterRegistry, Aggregator, ChallengeDesk, ChallengeMediator, EngineFailure, EngineId,
    SearchConfig, SearchError,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GOOGLE_PAGE: &str = r#"<html><head><title>cats - Google Search</title></head><body>
<div class="g"><a href="https://x.com/cats?utm_source=google"><h3>Cats</h3></a>
  <div class="VwiC3b">Cats.</div></div>
<div class="g"><a href="https://only-google.example/"><h3>Only on Google</h3></a></div>
</body></html>"#;

const BING_PAGE: &str = r#"<html><head><title>cats - Search</title></head><body><ol id="b_results">
<li class="b_algo"><h2><a href="https://www.x.com/cats">Cats - Wikipedia</a></h2>
  <div class="b_caption"><p>The cat is a small domesticated carnivorous mammal.</p></div></li>
</ol></body></html>"#;

fn config() -> SearchConfig {
    SearchConfig {
        timeout_seconds: 5,
        timeout_overrides: vec![],
        request_timeout_seconds: 10,
        navigation_delay_ms: (0, 0),
        settle_delay_ms: (0, 0),
        ..Default::default()
    }
}

async fn service(server: &MockServer, history: Arc<MemoryHistory>) -> SearchService {
    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GOOGLE_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BING_PAGE))
        .mount(server)
        .await;

    let config = config();
    let mut registry = AdapterRegistry::new();
    for (engine, route) in [(EngineId::Google, "google"), (EngineId::Bing, "bing")] {
        registry.register(Arc::new(
            HtmlAdapter::new(engines::profile(engine), config.max_findings_per_engine)
                .with_base_url(format!("{}/{route}", server.uri())),
        ));
    }
    let desk = ChallengeDesk::new();
    let mediator = ChallengeMediator::from_config(Arc::new(DeskOperator::new(desk.clone())), &config);
    let aggregator = Aggregator::new(config, registry, mediator).expect("valid config");
    SearchService::new(aggregator, Some(history), desk)
}

#[tokio::test]
async fn overlapping_engines_are_merged_ranked_and_saved() {
    let server = MockServer::start().await;
    let history = Arc::new(MemoryHistory::new());
    let service = service(&server, Arc::clone(&history)).await;

    let run = service
        .search("cats", &["google", "bing", "yandex"], "global", "auto", &CancellationToken::new())
        .await
        .expect("search");
    let response = &run.response;

    assert_eq!(response.total_unique_results(), 2);
    let top = &response.aggregated_results()[0];
    assert_eq!(top.normalized_url(), "https://x.com/cats");
    assert_eq!(top.title(), "Cats - Wikipedia");
    assert_eq!(top.description(), "The cat is a small domesticated carnivorous mammal.");
    assert_eq!(top.contributing_engines(), ["google", "bing"]);
    assert_eq!(top.score(), 2.0);
    assert_eq!(response.aggregated_results()[1].raw_score(), 1);

    // yandex has no adapter in this registry.
    assert_eq!(
        response.per_engine_results().get("yandex").and_then(|o| o.failure()),
        Some(&EngineFailure::UnsupportedEngine)
    );

    let id = run.search_id.expect("persisted");
    let record = history.get(id).expect("get").expect("present");
    assert_eq!(record.query, "cats");
    assert_eq!(record.aggregated_results, response.aggregated_results());
    assert_eq!(
        record.per_engine_results.get("google").map(|o| o.contribution().len()),
        Some(2)
    );
    assert_eq!(service.aggregator().sessions().active(), 0);
}

#[tokio::test]
async fn rejected_request_is_not_saved() {
    let server = MockServer::start().await;
    let history = Arc::new(MemoryHistory::new());
    let service = service(&server, Arc::clone(&history)).await;

    let engines: [&str; 0] = [];
    let result = service
        .search("cats", &engines, "global", "auto", &CancellationToken::new())
        .await;
    assert!(matches!(
        result,
        Err(QuorumError::Search(SearchError::InvalidRequest(_)))
    ));
    assert!(history.is_empty());
}

#[tokio::test]
async fn history_lists_newest_first_across_searches() {
    let server = MockServer::start().await;
    let history = Arc::new(MemoryHistory::new());
    let service = service(&server, Arc::clone(&history)).await;
    let cancel = CancellationToken::new();

    let first = service
        .search("cats", &["google"], "fr", "fr", &cancel)
        .await
        .expect("search")
        .search_id
        .expect("id");
    let second = service
        .search("dogs", &["bing"], "mars", "klingon", &cancel)
        .await
        .expect("search")
        .search_id
        .expect("id");

    let listing = history.list().expect("list");
    assert_eq!(listing.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second, first]);

    let dogs = history.get(second).expect("get").expect("present");
    assert_eq!(dogs.region, "global", "unknown region falls back");
    assert_eq!(dogs.language, "auto", "unknown language falls back");
}
