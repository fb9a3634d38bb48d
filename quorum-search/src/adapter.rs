//! The source adapter contract and the adapter registry.
//!
//! The registry is a closed mapping from [`EngineId`] to an adapter,
//! populated once at startup. Engine names in a request are resolved by
//! parsing them into an [`EngineId`]; anything that does not parse, or has
//! no registered adapter, is unsupported.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SearchConfig;
use crate::engines::{self, HtmlAdapter};
use crate::error::AdapterError;
use crate::session::Session;
use crate::types::{EngineId, Language, RawFinding, Region};

/// Fetches raw findings for a query from one engine.
///
/// Implementations must report failure through [`AdapterError`] rather
/// than an empty or sentinel finding list. A challenge reached during
/// navigation surfaces as [`AdapterError::Challenge`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn engine(&self) -> EngineId;

    /// Navigate `session` to the engine and extract findings for `query`.
    async fn fetch(
        &self,
        query: &str,
        region: Region,
        language: Language,
        session: &mut Session,
    ) -> Result<Vec<RawFinding>, AdapterError>;

    /// Re-run extraction after a challenge was mediated on `session`.
    ///
    /// The default fetches from scratch.
    async fn resume(
        &self,
        query: &str,
        region: Region,
        language: Language,
        session: &mut Session,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        self.fetch(query, region, language, session).await
    }

    /// Whether a challenge on this engine should be escalated to a human.
    fn supports_challenge_retry(&self) -> bool {
        true
    }
}

/// Maps engine identifiers to their adapters.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<EngineId, Arc<dyn SourceAdapter>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("engines", &self.engines())
            .finish()
    }
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the HTML adapter for every known engine.
    pub fn with_html_engines(config: &SearchConfig) -> Self {
        let mut registry = Self::new();
        for engine in EngineId::all() {
            registry.register(Arc::new(HtmlAdapter::new(
                engines::profile(*engine),
                config.max_findings_per_engine,
            )));
        }
        registry
    }

    /// Register `adapter` under its own engine, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        self.adapters.insert(adapter.engine(), adapter);
        self
    }

    /// Look up the adapter for an engine name (case-insensitive).
    pub fn resolve(&self, name: &str) -> Option<(EngineId, Arc<dyn SourceAdapter>)> {
        let engine = name.parse::<EngineId>().ok()?;
        self.adapters
            .get(&engine)
            .map(|adapter| (engine, Arc::clone(adapter)))
    }

    /// Registered engines in name order.
    pub fn engines(&self) -> Vec<EngineId> {
        let mut engines: Vec<EngineId> = self.adapters.keys().copied().collect();
        engines.sort_by_key(|e| e.name());
        engines
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
