//! Result reconciliation: merge, score and rank findings across engines.
//!
//! [`reconcile`] is a pure function of its input. Findings are visited in
//! request order (engines) and list order (findings within an engine), so
//! the output never depends on which engine happened to finish first.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::url_normalize::normalize_url;
use crate::outcome::Outcomes;
use crate::types::AggregatedResult;

/// Merge every engine's findings into one ranked, de-duplicated list.
///
/// Findings that share a normalised URL become one [`AggregatedResult`]
/// listing every engine that returned it. Failed outcomes contribute
/// nothing; their placeholders are for display only.
///
/// Ordering: score descending, then title ascending, then normalised URL
/// ascending, which is a total order over distinct results.
pub fn reconcile(outcomes: &Outcomes) -> Vec<AggregatedResult> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<AggregatedResult> = Vec::new();

    for (engine, outcome) in outcomes.iter() {
        for finding in outcome.contribution() {
            let key = normalize_url(&finding.url);
            match index.get(&key) {
                Some(&slot) => merged[slot].absorb(engine, finding),
                None => {
                    index.insert(key.clone(), merged.len());
                    merged.push(AggregatedResult::seed(key, engine, finding));
                }
            }
        }
    }

    merged.sort_by(ranking);
    tracing::debug!(
        engines = outcomes.len(),
        unique = merged.len(),
        "reconciled findings"
    );
    merged
}

fn ranking(a: &AggregatedResult, b: &AggregatedResult) -> Ordering {
    b.score()
        .partial_cmp(&a.score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.title().cmp(b.title()))
        .then_with(|| a.normalized_url().cmp(b.normalized_url()))
}
