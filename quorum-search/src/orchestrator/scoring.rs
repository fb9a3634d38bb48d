//! Agreement scoring.
//!
//! A result's score is the number of distinct engines that returned it,
//! capped at five and rounded to one decimal place. It depends on nothing
//! but the raw count.

use crate::types::EngineId;

/// Highest score a result can reach.
pub const MAX_SCORE: f64 = 5.0;

/// Engines listed first when showing where a result came from.
const DISPLAY_PRIORITY: &[EngineId] = &[
    EngineId::Google,
    EngineId::Bing,
    EngineId::DuckDuckGo,
    EngineId::Yandex,
    EngineId::Ecosia,
];

/// Score for a result seen by `raw_score` distinct engines.
///
/// ```
/// use quorum_search::orchestrator::scoring::score;
///
/// assert_eq!(score(2), 2.0);
/// assert_eq!(score(9), 5.0);
/// ```
pub fn score(raw_score: usize) -> f64 {
    let capped = (raw_score as f64).min(MAX_SCORE);
    (capped * 10.0).round() / 10.0
}

/// Up to three contributing engines, ordered for display.
///
/// Engines in the priority list come first, in priority order; the rest
/// follow in the order given.
pub fn top_engines(engines: &[String]) -> Vec<String> {
    let rank = |name: &str| {
        DISPLAY_PRIORITY
            .iter()
            .position(|e| e.name() == name)
            .unwrap_or(DISPLAY_PRIORITY.len())
    };
    let mut ordered: Vec<&String> = engines.iter().collect();
    // Stable sort keeps the given order among equal ranks.
    ordered.sort_by_key(|name| rank(name));
    ordered.into_iter().take(3).cloned().collect()
}
