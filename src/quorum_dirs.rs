//! Centralized path resolution for quorum.
//!
//! Defaults to the platform directories. Environment overrides exist for
//! tests and sandboxed deployments:
//!
//! - `QUORUM_CONFIG_DIR` overrides [`config_dir`]
//! - `QUORUM_DATA_DIR` overrides [`data_dir`]

use std::path::PathBuf;

/// Application configuration directory.
///
/// Resolves to `dirs::config_dir()/quorum/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("QUORUM_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("quorum"))
        .unwrap_or_else(|| PathBuf::from("/tmp/quorum-config"))
}

/// Application data directory.
///
/// Resolves to `dirs::data_dir()/quorum/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("QUORUM_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("quorum"))
        .unwrap_or_else(|| PathBuf::from("/tmp/quorum-data"))
}

/// Search history database (`data_dir()/history.db`).
#[must_use]
pub fn history_db() -> PathBuf {
    data_dir().join("history.db")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let file = config_file();
        assert_eq!(file.parent(), Some(config_dir().as_path()));
        assert!(file.ends_with("config.toml"));
    }

    #[test]
    fn history_db_lives_in_data_dir() {
        let db = history_db();
        assert_eq!(db.parent(), Some(data_dir().as_path()));
        assert!(db.ends_with("history.db"));
    }
}
