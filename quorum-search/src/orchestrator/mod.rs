//! Search orchestrator: concurrent dispatch, normalisation, reconciliation.
//!
//! [`Aggregator`] fans a request out to its engines and collects one
//! outcome per engine. [`reconcile`] then merges the findings by normalised
//! URL, scores each result by how many engines agree on it, and sorts.

pub mod dispatch;
pub mod reconcile;
pub mod scoring;
pub mod url_normalize;

pub use dispatch::Aggregator;
pub use reconcile::reconcile;
pub use scoring::{score, top_engines};
pub use url_normalize::normalize_url;
