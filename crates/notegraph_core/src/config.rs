//! Runtime configuration.
//!
//! Values come from the environment with fixed defaults. Blank variables are
//! treated as unset.

use crate::logging::default_log_level;
use std::path::PathBuf;

/// Overrides the state directory (database and downloads).
pub const DATA_DIR_ENV: &str = "NOTEGRAPH_DATA_DIR";
/// Overrides the log level.
pub const LOG_LEVEL_ENV: &str = "NOTEGRAPH_LOG_LEVEL";
/// Overrides the log directory.
pub const LOG_DIR_ENV: &str = "NOTEGRAPH_LOG_DIR";

const STATE_DB_FILE_NAME: &str = "notegraph_state.sqlite3";
const DEFAULT_DATA_DIR_NAME: &str = "notegraph";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl CoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        let data_dir = value(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME));
        let log_level = value(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = value(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs"));

        Self {
            data_dir,
            log_level,
            log_dir,
        }
    }

    /// SQLite file holding version history and the remembered directory.
    pub fn state_db_path(&self) -> PathBuf {
        self.data_dir.join(STATE_DB_FILE_NAME)
    }

    /// Directory the command-line download fallback writes into.
    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }
}
