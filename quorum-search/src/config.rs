//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls per-engine and request-level time budgets,
//! extraction limits, pacing between navigation steps, and how long a
//! challenge may wait for a human. The defaults mirror what the engines
//! actually need: most answer within 30 seconds, Yandex, Baidu and Brave
//! can take up to a minute.

use std::time::Duration;

use crate::error::SearchError;
use crate::types::EngineId;

/// Configuration for a search dispatch.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Per-engine time budget in seconds, unless overridden below.
    pub timeout_seconds: u64,
    /// Engine-specific time budgets in seconds.
    pub timeout_overrides: Vec<(EngineId, u64)>,
    /// Upper bound for the whole request. Units still pending when it
    /// expires settle as timed out.
    pub request_timeout_seconds: u64,
    /// Maximum findings extracted from a single engine.
    pub max_findings_per_engine: usize,
    /// Random delay range in milliseconds `(min, max)` between navigation steps.
    pub navigation_delay_ms: (u64, u64),
    /// Random delay range in milliseconds after a resolved challenge, before
    /// extraction resumes.
    pub settle_delay_ms: (u64, u64),
    /// How long mediation waits for a human before abandoning.
    pub challenge_wait_seconds: u64,
    /// Custom User-Agent string. If `None`, one is drawn from the identity
    /// pools for the request's region and language.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            timeout_overrides: vec![
                (EngineId::Yandex, 60),
                (EngineId::Baidu, 60),
                (EngineId::Brave, 60),
            ],
            request_timeout_seconds: 180,
            max_findings_per_engine: 10,
            navigation_delay_ms: (1000, 3000),
            settle_delay_ms: (2000, 3000),
            challenge_wait_seconds: 300,
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Time budget for one engine's adapter calls.
    pub fn engine_timeout(&self, engine: EngineId) -> Duration {
        let secs = self
            .timeout_overrides
            .iter()
            .rev()
            .find(|(e, _)| *e == engine)
            .map_or(self.timeout_seconds, |(_, secs)| *secs);
        Duration::from_secs(secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn challenge_wait(&self) -> Duration {
        Duration::from_secs(self.challenge_wait_seconds)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - every timeout (default, overrides, request, challenge wait) is greater than 0
    /// - `max_findings_per_engine` is greater than 0
    /// - both delay ranges have `min <= max`
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if let Some((engine, _)) = self.timeout_overrides.iter().find(|(_, secs)| *secs == 0) {
            return Err(SearchError::Config(format!(
                "timeout override for {engine} must be greater than 0"
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(SearchError::Config(
                "request_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_findings_per_engine == 0 {
            return Err(SearchError::Config(
                "max_findings_per_engine must be greater than 0".into(),
            ));
        }
        if self.navigation_delay_ms.0 > self.navigation_delay_ms.1 {
            return Err(SearchError::Config(
                "navigation_delay_ms min must be <= max".into(),
            ));
        }
        if self.settle_delay_ms.0 > self.settle_delay_ms.1 {
            return Err(SearchError::Config(
                "settle_delay_ms min must be <= max".into(),
            ));
        }
        if self.challenge_wait_seconds == 0 {
            return Err(SearchError::Config(
                "challenge_wait_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
