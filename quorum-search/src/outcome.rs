//! Per-engine dispatch outcomes.
//!
//! Every selected engine settles into exactly one [`EngineOutcome`]: either
//! the findings it produced, or a typed [`EngineFailure`] paired with a
//! human-readable placeholder finding so that callers can render all engines
//! uniformly. Placeholders never contribute to reconciliation.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::types::{AggregatedResult, EngineId, RawFinding};

/// Why an engine produced no usable findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EngineFailure {
    /// The engine name is not in the adapter registry. Never dispatched.
    UnsupportedEngine,
    /// The adapter exceeded its time budget or the request was cancelled.
    Timeout,
    /// The adapter completed but found nothing.
    NoResults,
    /// A challenge was hit and mediation was abandoned or cancelled.
    ChallengeUnresolved,
    /// Any other adapter-internal failure.
    Adapter(String),
}

impl EngineFailure {
    /// Short stable label for logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnsupportedEngine => "unsupported_engine",
            Self::Timeout => "timeout",
            Self::NoResults => "no_results",
            Self::ChallengeUnresolved => "challenge_unresolved",
            Self::Adapter(_) => "adapter_error",
        }
    }
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter(msg) => write!(f, "adapter error: {msg}"),
            other => f.write_str(other.label()),
        }
    }
}

/// The settled result of dispatching one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineOutcome {
    /// The adapter returned at least one finding.
    Found { findings: Vec<RawFinding> },
    /// The engine failed; `placeholder` describes why.
    Failed {
        failure: EngineFailure,
        placeholder: RawFinding,
    },
}

impl EngineOutcome {
    /// Build the outcome for a completed adapter call.
    ///
    /// An empty list becomes [`EngineFailure::NoResults`].
    pub fn from_findings(engine: &str, query: &str, findings: Vec<RawFinding>) -> Self {
        if findings.is_empty() {
            Self::failed(engine, query, EngineFailure::NoResults)
        } else {
            Self::Found { findings }
        }
    }

    /// Build a failed outcome with its placeholder finding.
    pub fn failed(engine: &str, query: &str, failure: EngineFailure) -> Self {
        let placeholder = placeholder_for(engine, query, &failure);
        Self::Failed {
            failure,
            placeholder,
        }
    }

    /// Findings that take part in reconciliation. Empty for failures.
    pub fn contribution(&self) -> &[RawFinding] {
        match self {
            Self::Found { findings } => findings,
            Self::Failed { .. } => &[],
        }
    }

    /// Findings for display: real findings, or the single placeholder.
    pub fn display_findings(&self) -> &[RawFinding] {
        match self {
            Self::Found { findings } => findings,
            Self::Failed { placeholder, .. } => std::slice::from_ref(placeholder),
        }
    }

    pub fn failure(&self) -> Option<&EngineFailure> {
        match self {
            Self::Found { .. } => None,
            Self::Failed { failure, .. } => Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Build the placeholder finding shown in place of a failed engine's results.
fn placeholder_for(engine: &str, query: &str, failure: &EngineFailure) -> RawFinding {
    let known = engine.parse::<EngineId>().ok();
    let name = known.map_or(engine, |e| e.display_name());
    let url = known.map_or_else(
        || "about:blank".to_string(),
        |e| crate::engines::search_page_url(e, query),
    );

    let (title, description) = match failure {
        EngineFailure::UnsupportedEngine => (
            format!("Unsupported engine \"{engine}\""),
            "This engine is not available in the adapter registry.".to_string(),
        ),
        EngineFailure::Timeout => (
            format!("{name} timed out"),
            format!("{name} did not respond in time."),
        ),
        EngineFailure::NoResults => (
            format!("No {name} results for \"{query}\""),
            "The page loaded but no results were found. The result markup may have changed."
                .to_string(),
        ),
        EngineFailure::ChallengeUnresolved => (
            format!("{name} verification not completed"),
            format!("{name} asked for human verification and it was not completed."),
        ),
        EngineFailure::Adapter(msg) => (
            format!("{name} error"),
            format!("Error: {msg}. {name} is probably blocking automated requests."),
        ),
    };

    RawFinding::new(title, url, description)
}

/// Outcomes for one request, keyed by engine name, in request order.
///
/// Iteration order is the order engines appeared in the request, never the
/// order in which units finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcomes {
    entries: Vec<(String, EngineOutcome)>,
}

impl Outcomes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the outcome for `engine`, keeping its position.
    pub fn insert(&mut self, engine: impl Into<String>, outcome: EngineOutcome) {
        let engine = engine.into();
        match self.entries.iter_mut().find(|(name, _)| *name == engine) {
            Some(slot) => slot.1 = outcome,
            None => self.entries.push((engine, outcome)),
        }
    }

    pub fn get(&self, engine: &str) -> Option<&EngineOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == engine)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EngineOutcome)> {
        self.entries.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Engine names in request order.
    pub fn engines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, EngineOutcome)> for Outcomes {
    fn from_iter<T: IntoIterator<Item = (String, EngineOutcome)>>(iter: T) -> Self {
        let mut outcomes = Self::new();
        for (engine, outcome) in iter {
            outcomes.insert(engine, outcome);
        }
        outcomes
    }
}

impl Serialize for Outcomes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (engine, outcome) in &self.entries {
            map.serialize_entry(engine, outcome)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Outcomes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OutcomesVisitor;

        impl<'de> Visitor<'de> for OutcomesVisitor {
            type Value = Outcomes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of engine name to outcome")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Outcomes, A::Error> {
                let mut outcomes = Outcomes::new();
                while let Some((engine, outcome)) = access.next_entry::<String, EngineOutcome>()? {
                    outcomes.insert(engine, outcome);
                }
                Ok(outcomes)
            }
        }

        deserializer.deserialize_map(OutcomesVisitor)
    }
}

/// What a search returns: per-engine outcomes plus the reconciled list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    query: String,
    per_engine_results: Outcomes,
    aggregated_results: Vec<AggregatedResult>,
    total_unique_results: usize,
}

impl SearchResponse {
    pub fn new(
        query: impl Into<String>,
        per_engine_results: Outcomes,
        aggregated_results: Vec<AggregatedResult>,
    ) -> Self {
        let total_unique_results = aggregated_results.len();
        Self {
            query: query.into(),
            per_engine_results,
            aggregated_results,
            total_unique_results,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn per_engine_results(&self) -> &Outcomes {
        &self.per_engine_results
    }

    pub fn aggregated_results(&self) -> &[AggregatedResult] {
        &self.aggregated_results
    }

    pub fn total_unique_results(&self) -> usize {
        self.total_unique_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(url: &str) -> RawFinding {
        RawFinding::new("Title", url, "Description")
    }

    #[test]
    fn empty_findings_become_no_results() {
        let outcome = EngineOutcome::from_findings("bing", "cats", vec![]);
        assert_eq!(outcome.failure(), Some(&EngineFailure::NoResults));
        assert!(outcome.contribution().is_empty());
        assert_eq!(outcome.display_findings().len(), 1);
    }

    #[test]
    fn found_outcome_contributes_findings() {
        let outcome = EngineOutcome::from_findings("bing", "cats", vec![finding("https://a.com")]);
        assert!(outcome.is_success());
        assert_eq!(outcome.contribution().len(), 1);
        assert_eq!(outcome.display_findings(), outcome.contribution());
    }

    #[test]
    fn placeholder_points_at_engine_search_page() {
        let outcome = EngineOutcome::failed("google", "rust lang", EngineFailure::Timeout);
        let placeholder = &outcome.display_findings()[0];
        assert_eq!(placeholder.title, "Google timed out");
        assert!(placeholder.url.starts_with("https://www.google.com/search?q=rust"));
    }

    #[test]
    fn unsupported_engine_placeholder_has_blank_url() {
        let outcome = EngineOutcome::failed("altavista", "cats", EngineFailure::UnsupportedEngine);
        let placeholder = &outcome.display_findings()[0];
        assert_eq!(placeholder.url, "about:blank");
        assert!(placeholder.title.contains("altavista"));
    }

    #[test]
    fn adapter_error_placeholder_mentions_message() {
        let outcome = EngineOutcome::failed(
            "bing",
            "cats",
            EngineFailure::Adapter("navigation failed: 503".into()),
        );
        assert!(outcome.display_findings()[0].description.contains("503"));
    }

    #[test]
    fn failures_are_distinguishable() {
        let labels: std::collections::HashSet<&str> = [
            EngineFailure::UnsupportedEngine,
            EngineFailure::Timeout,
            EngineFailure::NoResults,
            EngineFailure::ChallengeUnresolved,
            EngineFailure::Adapter("x".into()),
        ]
        .iter()
        .map(EngineFailure::label)
        .collect();
        assert_eq!(labels.len(), 5);
    }

    #[test]
    fn outcomes_keep_insertion_order_and_replace_in_place() {
        let mut outcomes = Outcomes::new();
        outcomes.insert("b", EngineOutcome::failed("b", "q", EngineFailure::Timeout));
        outcomes.insert("a", EngineOutcome::from_findings("a", "q", vec![finding("https://a.com")]));
        outcomes.insert("b", EngineOutcome::from_findings("b", "q", vec![finding("https://b.com")]));

        let names: Vec<&str> = outcomes.engines().collect();
        assert_eq!(names, ["b", "a"]);
        assert!(outcomes.get("b").is_some_and(EngineOutcome::is_success));
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn outcomes_serialize_as_ordered_map() {
        let mut outcomes = Outcomes::new();
        outcomes.insert("z", EngineOutcome::failed("z", "q", EngineFailure::UnsupportedEngine));
        outcomes.insert("a", EngineOutcome::failed("a", "q", EngineFailure::UnsupportedEngine));
        let json = serde_json::to_string(&outcomes).expect("serialize");
        let z = json.find("\"z\"").expect("z present");
        let a = json.find("\"a\"").expect("a present");
        assert!(z < a);
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("\"kind\":\"unsupported_engine\""));
    }

    #[test]
    fn stored_outcomes_read_back_in_request_order() {
        let mut outcomes = Outcomes::new();
        outcomes.insert("yandex", EngineOutcome::failed("yandex", "q", EngineFailure::Timeout));
        outcomes.insert("bing", EngineOutcome::from_findings("bing", "q", vec![finding("https://b.com")]));
        outcomes.insert(
            "google",
            EngineOutcome::failed("google", "q", EngineFailure::Adapter("blocked".into())),
        );

        let json = serde_json::to_string(&outcomes).expect("serialize");
        let restored: Outcomes = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored, outcomes);
        assert_eq!(restored.engines().collect::<Vec<_>>(), ["yandex", "bing", "google"]);
    }
}
