//! SQLite-backed search history.
//!
//! One row per search in a single database file. Outcomes and aggregated
//! results are stored as JSON text; everything needed for a listing has
//! its own column so `list` never decodes them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use quorum_search::{AggregatedResult, Outcomes, SearchRequest};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{HistoryStore, SearchRecord, SearchSummary};
use crate::error::{QuorumError, Result};

/// Schema version stamped into new databases.
pub const SCHEMA_VERSION: u32 = 1;

/// Idempotent DDL for the history database.
const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- `seq` orders searches by insertion; `id` is the public identifier.
CREATE TABLE IF NOT EXISTS searches (
    seq                INTEGER PRIMARY KEY AUTOINCREMENT,
    id                 TEXT NOT NULL UNIQUE,
    created_at         TEXT NOT NULL,      -- RFC 3339, UTC
    query              TEXT NOT NULL,
    engines            TEXT NOT NULL,      -- JSON array of engine names
    region             TEXT NOT NULL,
    language           TEXT NOT NULL,
    per_engine_results TEXT NOT NULL,      -- JSON map, request order
    aggregated_results TEXT NOT NULL,      -- JSON array
    total_unique       INTEGER NOT NULL
);
"#;

/// Search history in an SQLite file.
///
/// All access goes through one `Mutex<Connection>`.
pub struct SqliteHistory {
    path: PathBuf,
    conn: Mutex<Connection>,
    max_entries: Option<usize>,
}

impl std::fmt::Debug for SqliteHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteHistory")
            .field("path", &self.path)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl SqliteHistory {
    /// Open (or create) the database at `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        tracing::info!(path = %path.display(), "search history database opened");
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            max_entries: None,
        })
    }

    /// Keep at most `max_entries` searches, dropping the oldest.
    ///
    /// `max_entries` must be at least 1.
    pub fn with_capacity_limit(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema version recorded in the database.
    pub fn schema_version(&self) -> Result<Option<u32>> {
        let conn = self.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM schema_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|v| v.parse().ok()))
    }

    /// Number of retained searches.
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM searches", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

impl HistoryStore for SqliteHistory {
    fn save(
        &self,
        request: &SearchRequest,
        outcomes: &Outcomes,
        aggregated: &[AggregatedResult],
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let engines = to_json(&request.engines(), "engines")?;
        let per_engine = to_json(outcomes, "per-engine results")?;
        let merged = to_json(&aggregated, "aggregated results")?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO searches (id, created_at, query, engines, region, language, \
             per_engine_results, aggregated_results, total_unique) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.to_string(),
                created_at.to_rfc3339(),
                request.query(),
                engines,
                request.region().code(),
                request.language().code(),
                per_engine,
                merged,
                i64::try_from(aggregated.len()).unwrap_or(i64::MAX),
            ],
        )?;

        if let Some(max) = self.max_entries {
            let evicted = conn.execute(
                "DELETE FROM searches WHERE seq NOT IN \
                 (SELECT seq FROM searches ORDER BY seq DESC LIMIT ?1)",
                params![i64::try_from(max).unwrap_or(i64::MAX)],
            )?;
            if evicted > 0 {
                tracing::debug!(evicted, "history full; oldest searches dropped");
            }
        }
        tracing::debug!(%id, "search saved to history");
        Ok(id)
    }

    fn list(&self) -> Result<Vec<SearchSummary>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, query, engines, total_unique FROM searches ORDER BY seq DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, created_at, query, engines, total) = row?;
            summaries.push(SearchSummary {
                id: parse_id(&id)?,
                created_at: parse_time(&created_at)?,
                query,
                engines: from_json(&engines, "engines")?,
                total_unique_results: usize::try_from(total).unwrap_or(0),
            });
        }
        Ok(summaries)
    }

    fn get(&self, id: Uuid) -> Result<Option<SearchRecord>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT created_at, query, engines, region, language, \
                 per_engine_results, aggregated_results FROM searches WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((created_at, query, engines, region, language, per_engine, merged)) = row else {
            return Ok(None);
        };
        Ok(Some(SearchRecord {
            id,
            created_at: parse_time(&created_at)?,
            query,
            engines: from_json(&engines, "engines")?,
            region,
            language,
            per_engine_results: from_json(&per_engine, "per-engine results")?,
            aggregated_results: from_json(&merged, "aggregated results")?,
        }))
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        let conn = self.lock();
        let removed = conn.execute("DELETE FROM searches WHERE id = ?1", params![id.to_string()])?;
        if removed == 0 {
            return Err(QuorumError::History(format!("search {id} not found")));
        }
        Ok(())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| QuorumError::History(format!("failed to encode {what}: {e}")))
}

fn from_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| QuorumError::History(format!("corrupt stored {what}: {e}")))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| QuorumError::History(format!("corrupt search id {raw:?}: {e}")))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| QuorumError::History(format!("corrupt timestamp {raw:?}: {e}")))
}
