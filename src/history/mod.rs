//! Search history: the persistence collaborator behind the search service.
//!
//! A store receives the request, the per-engine outcomes and the final
//! aggregated results of every completed search, assigns a durable id and
//! keeps the lot for later retrieval.
//!
//! Two stores ship: [`SqliteHistory`] for the host, and [`MemoryHistory`]
//! for tests and embedders that do not want files.

mod sqlite;

pub use sqlite::{SCHEMA_VERSION, SqliteHistory};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use quorum_search::{AggregatedResult, Outcomes, SearchRequest};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{HistoryBackend, HistorySection};
use crate::error::{QuorumError, Result};

/// One persisted search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub query: String,
    pub engines: Vec<String>,
    pub region: String,
    pub language: String,
    pub per_engine_results: Outcomes,
    pub aggregated_results: Vec<AggregatedResult>,
}

impl SearchRecord {
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            id: self.id,
            created_at: self.created_at,
            query: self.query.clone(),
            engines: self.engines.clone(),
            total_unique_results: self.aggregated_results.len(),
        }
    }
}

/// A history listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub query: String,
    pub engines: Vec<String>,
    pub total_unique_results: usize,
}

/// Storage for completed searches.
pub trait HistoryStore: Send + Sync {
    /// Persist a completed search and return its id.
    fn save(
        &self,
        request: &SearchRequest,
        outcomes: &Outcomes,
        aggregated: &[AggregatedResult],
    ) -> Result<Uuid>;

    /// All retained searches, newest first.
    fn list(&self) -> Result<Vec<SearchSummary>>;

    /// One search, or `None` if the id is unknown.
    fn get(&self, id: Uuid) -> Result<Option<SearchRecord>>;

    /// Delete one search.
    ///
    /// # Errors
    ///
    /// Returns [`QuorumError::History`] if no search has that id.
    fn delete(&self, id: Uuid) -> Result<()>;
}

/// Open the store `section` selects, or `None` when history is disabled.
///
/// # Errors
///
/// Returns an error if the SQLite database cannot be opened or migrated.
pub fn open_store(section: &HistorySection) -> Result<Option<Arc<dyn HistoryStore>>> {
    if !section.enabled {
        return Ok(None);
    }
    let store: Arc<dyn HistoryStore> = match section.store {
        HistoryBackend::Memory => Arc::new(match section.max_entries {
            Some(max) => MemoryHistory::with_capacity_limit(max),
            None => MemoryHistory::new(),
        }),
        HistoryBackend::Sqlite => {
            let store = SqliteHistory::open(&section.database_path())?;
            Arc::new(match section.max_entries {
                Some(max) => store.with_capacity_limit(max),
                None => store,
            })
        }
    };
    Ok(Some(store))
}

/// In-process history, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    /// Oldest at the front.
    records: Mutex<VecDeque<SearchRecord>>,
    max_entries: Option<usize>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_entries` searches, dropping the oldest.
    ///
    /// `max_entries` must be at least 1.
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self {
            records: Mutex::default(),
            max_entries: Some(max_entries),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<SearchRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HistoryStore for MemoryHistory {
    fn save(
        &self,
        request: &SearchRequest,
        outcomes: &Outcomes,
        aggregated: &[AggregatedResult],
    ) -> Result<Uuid> {
        let record = SearchRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            query: request.query().to_owned(),
            engines: request.engines().to_vec(),
            region: request.region().code().to_owned(),
            language: request.language().code().to_owned(),
            per_engine_results: outcomes.clone(),
            aggregated_results: aggregated.to_vec(),
        };
        let id = record.id;

        let mut records = self.lock();
        records.push_back(record);
        if let Some(max) = self.max_entries {
            while records.len() > max {
                if let Some(evicted) = records.pop_front() {
                    tracing::debug!(id = %evicted.id, "history full; oldest search dropped");
                }
            }
        }
        tracing::debug!(%id, retained = records.len(), "search saved to history");
        Ok(id)
    }

    fn list(&self) -> Result<Vec<SearchSummary>> {
        Ok(self.lock().iter().rev().map(SearchRecord::summary).collect())
    }

    fn get(&self, id: Uuid) -> Result<Option<SearchRecord>> {
        Ok(self.lock().iter().find(|r| r.id == id).cloned())
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        let mut records = self.lock();
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Err(QuorumError::History(format!("search {id} not found")));
        };
        records.remove(index);
        Ok(())
    }
}
