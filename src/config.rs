//! Configuration file for the quorum host.
//!
//! The file is TOML with four sections. Every field has a default, so an
//! empty or partial file is valid:
//!
//! ```toml
//! [search]
//! default_engines = ["google", "bing", "duckduckgo"]
//! timeout_seconds = 30
//!
//! [search.timeout_overrides]
//! yandex = 60
//!
//! [session]
//! navigation_delay = { min_ms = 1000, max_ms = 3000 }
//!
//! [challenge]
//! wait_seconds = 300
//! operator = "browser"
//! browser_program = "chromium"
//! browser_args = ["--new-window", "--window-size={width},{height}", "{url}"]
//!
//! [history]
//! enabled = true
//! store = "sqlite"
//! path = "/var/lib/quorum/history.db"
//! max_entries = 200
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quorum_search::challenge::{BrowserOperator, DeskOperator, HumanOperator};
use quorum_search::{ChallengeDesk, EngineId, SearchConfig};
use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    /// Engines, time budgets and extraction limits.
    pub search: SearchSection,
    /// Browsing session identity and pacing.
    pub session: SessionSection,
    /// Human challenge mediation.
    pub challenge: ChallengeSection,
    /// Search history retention.
    pub history: HistorySection,
}

/// `[search]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Engines used when a caller does not name any.
    pub default_engines: Vec<String>,
    pub default_region: String,
    pub default_language: String,
    /// Per-engine time budget in seconds.
    pub timeout_seconds: u64,
    /// Engine name to time budget in seconds.
    pub timeout_overrides: BTreeMap<String, u64>,
    pub request_timeout_seconds: u64,
    pub max_findings_per_engine: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        let core = SearchConfig::default();
        Self {
            default_engines: vec!["google".into(), "bing".into(), "duckduckgo".into()],
            default_region: "global".into(),
            default_language: "auto".into(),
            timeout_seconds: core.timeout_seconds,
            timeout_overrides: core
                .timeout_overrides
                .iter()
                .map(|(engine, secs)| (engine.name().to_owned(), *secs))
                .collect(),
            request_timeout_seconds: core.request_timeout_seconds,
            max_findings_per_engine: core.max_findings_per_engine,
        }
    }
}

/// A randomized delay range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl From<(u64, u64)> for DelayRange {
    fn from((min_ms, max_ms): (u64, u64)) -> Self {
        Self { min_ms, max_ms }
    }
}

/// `[session]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Delay between navigation steps.
    pub navigation_delay: DelayRange,
    /// Delay after a resolved challenge, before extraction resumes.
    pub settle_delay: DelayRange,
    /// Fixed User-Agent. When unset, one is drawn per session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        let core = SearchConfig::default();
        Self {
            navigation_delay: core.navigation_delay_ms.into(),
            settle_delay: core.settle_delay_ms.into(),
            user_agent: None,
        }
    }
}

/// Who clears a challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorMode {
    /// Wait for `challenge.resolve` / `challenge.abandon` from the host.
    #[default]
    Desk,
    /// Open the challenged page in a visible browser; closing it resolves.
    Browser,
}

/// `[challenge]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSection {
    /// How long a challenge may wait for a human.
    pub wait_seconds: u64,
    pub operator: OperatorMode,
    /// Browser executable for [`OperatorMode::Browser`].
    pub browser_program: String,
    /// Arguments; `{url}`, `{width}` and `{height}` are substituted.
    pub browser_args: Vec<String>,
}

impl Default for ChallengeSection {
    fn default() -> Self {
        Self {
            wait_seconds: SearchConfig::default().challenge_wait_seconds,
            operator: OperatorMode::Desk,
            browser_program: "chromium".into(),
            browser_args: vec![
                "--new-window".into(),
                "--window-size={width},{height}".into(),
                "{url}".into(),
            ],
        }
    }
}

/// Where completed searches are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// SQLite database file that survives restarts.
    #[default]
    Sqlite,
    /// Process memory only.
    Memory,
}

/// `[history]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub enabled: bool,
    pub store: HistoryBackend,
    /// Database file for the `sqlite` store. Defaults to
    /// `<data dir>/quorum/history.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Oldest searches are dropped beyond this many. Unset keeps everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            store: HistoryBackend::Sqlite,
            path: None,
            max_entries: Some(200),
        }
    }
}

impl HistorySection {
    /// The database file the `sqlite` store opens.
    pub fn database_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(crate::quorum_dirs::history_db)
    }
}

impl QuorumConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| QuorumError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| QuorumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/quorum/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::quorum_dirs::config_file()
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns [`QuorumError::Config`] for `history.max_entries = 0` and
    /// anything [`Self::search_config`] rejects.
    pub fn validate(&self) -> Result<()> {
        if self.history.max_entries == Some(0) {
            return Err(QuorumError::Config(
                "history.max_entries must be greater than 0".into(),
            ));
        }
        self.search_config().map(|_| ())
    }

    /// Build the core search configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QuorumError::Config`] for an unknown engine name in
    /// `timeout_overrides` or `default_engines`, and the core's own
    /// validation error for out-of-range values.
    pub fn search_config(&self) -> Result<SearchConfig> {
        let timeout_overrides = self
            .search
            .timeout_overrides
            .iter()
            .map(|(name, secs)| {
                name.parse::<EngineId>()
                    .map(|engine| (engine, *secs))
                    .map_err(|e| QuorumError::Config(format!("search.timeout_overrides: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(bad) = self
            .search
            .default_engines
            .iter()
            .find(|name| name.parse::<EngineId>().is_err())
        {
            return Err(QuorumError::Config(format!(
                "search.default_engines: unknown engine: {bad}"
            )));
        }

        let config = SearchConfig {
            timeout_seconds: self.search.timeout_seconds,
            timeout_overrides,
            request_timeout_seconds: self.search.request_timeout_seconds,
            max_findings_per_engine: self.search.max_findings_per_engine,
            navigation_delay_ms: (
                self.session.navigation_delay.min_ms,
                self.session.navigation_delay.max_ms,
            ),
            settle_delay_ms: (self.session.settle_delay.min_ms, self.session.settle_delay.max_ms),
            challenge_wait_seconds: self.challenge.wait_seconds,
            user_agent: self.session.user_agent.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// The human operator selected by `[challenge] operator`.
    ///
    /// `desk` is handed out in both modes so that `challenge.abandon` can
    /// still be served; in browser mode it simply never has pending work.
    pub fn operator(&self, desk: &ChallengeDesk) -> Arc<dyn HumanOperator> {
        match self.challenge.operator {
            OperatorMode::Desk => Arc::new(DeskOperator::new(desk.clone())),
            OperatorMode::Browser => Arc::new(BrowserOperator::new(
                self.challenge.browser_program.clone(),
                self.challenge.browser_args.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_converts_to_core_defaults() {
        let core = QuorumConfig::default().search_config().expect("valid");
        let expected = SearchConfig::default();
        assert_eq!(core.timeout_seconds, expected.timeout_seconds);
        assert_eq!(core.request_timeout_seconds, expected.request_timeout_seconds);
        assert_eq!(core.engine_timeout(EngineId::Yandex), expected.engine_timeout(EngineId::Yandex));
        assert_eq!(core.engine_timeout(EngineId::Google), expected.engine_timeout(EngineId::Google));
        assert_eq!(core.navigation_delay_ms, expected.navigation_delay_ms);
        assert_eq!(core.challenge_wait_seconds, 300);
    }

    #[test]
    fn empty_toml_is_default() {
        let parsed: QuorumConfig = toml::from_str("").expect("parse");
        assert_eq!(parsed, QuorumConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let parsed: QuorumConfig = toml::from_str(
            r#"
            [search]
            timeout_seconds = 12

            [search.timeout_overrides]
            brave = 40

            [challenge]
            operator = "browser"
            browser_program = "firefox"
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.search.timeout_seconds, 12);
        assert_eq!(parsed.search.default_region, "global");
        assert_eq!(parsed.challenge.operator, OperatorMode::Browser);
        assert_eq!(parsed.challenge.wait_seconds, 300);

        let core = parsed.search_config().expect("valid");
        assert_eq!(core.engine_timeout(EngineId::Brave).as_secs(), 40);
        assert_eq!(core.engine_timeout(EngineId::Bing).as_secs(), 12);
    }

    #[test]
    fn unknown_override_engine_is_rejected() {
        let mut config = QuorumConfig::default();
        config.search.timeout_overrides.insert("altavista".into(), 10);
        assert!(matches!(config.search_config(), Err(QuorumError::Config(_))));
    }

    #[test]
    fn unknown_default_engine_is_rejected() {
        let mut config = QuorumConfig::default();
        config.search.default_engines.push("lycos".into());
        assert!(matches!(config.search_config(), Err(QuorumError::Config(_))));
    }

    #[test]
    fn inverted_delay_range_fails_core_validation() {
        let mut config = QuorumConfig::default();
        config.session.navigation_delay = DelayRange { min_ms: 500, max_ms: 100 };
        assert!(matches!(config.search_config(), Err(QuorumError::Search(_))));
    }

    #[test]
    fn zero_history_capacity_is_rejected() {
        let mut config = QuorumConfig::default();
        assert!(config.validate().is_ok());

        config.history.max_entries = Some(0);
        assert!(matches!(config.validate(), Err(QuorumError::Config(_))));

        config.history.max_entries = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn history_store_section_parses() {
        let parsed: QuorumConfig = toml::from_str(
            r#"
            [history]
            store = "memory"
            max_entries = 5
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.history.store, HistoryBackend::Memory);
        assert_eq!(parsed.history.max_entries, Some(5));
        assert!(parsed.history.enabled);

        let defaults = HistorySection::default();
        assert_eq!(defaults.store, HistoryBackend::Sqlite);
        assert!(defaults.database_path().ends_with("history.db"));

        let pinned = HistorySection {
            path: Some(PathBuf::from("/srv/quorum/h.db")),
            ..HistorySection::default()
        };
        assert_eq!(pinned.database_path(), PathBuf::from("/srv/quorum/h.db"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = QuorumConfig::default();
        config.search.default_engines = vec!["bing".into()];
        config.session.user_agent = Some("QuorumTest/1.0".into());
        config.history.max_entries = None;
        config.history.path = Some(dir.path().join("history.db"));
        config.save_to_file(&path).expect("save");

        let loaded = QuorumConfig::from_file(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");
        assert!(matches!(QuorumConfig::from_file(&path), Err(QuorumError::Config(_))));
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = QuorumConfig::load_or_default(&dir.path().join("missing.toml")).expect("defaults");
        assert_eq!(config, QuorumConfig::default());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = QuorumConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn operator_follows_mode() {
        let desk = ChallengeDesk::new();
        let mut config = QuorumConfig::default();
        assert_eq!(config.operator(&desk).name(), DeskOperator::new(desk.clone()).name());

        config.challenge.operator = OperatorMode::Browser;
        let browser = BrowserOperator::new("x", vec![]);
        assert_eq!(config.operator(&desk).name(), browser.name());
    }
}
