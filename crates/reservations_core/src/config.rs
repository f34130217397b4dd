//! Runtime configuration for core callers.
//!
//! # Responsibility
//! - Resolve database location, logging, and write-lock wait settings from
//!   the environment with stable defaults.
//!
//! # Invariants
//! - Unset variables fall back to defaults; malformed values are errors,
//!   never silently replaced.

use crate::db::DbOptions;
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "RESERVATIONS_DB";
pub const ENV_LOG_LEVEL: &str = "RESERVATIONS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "RESERVATIONS_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "RESERVATIONS_BUSY_TIMEOUT_MS";

const DEFAULT_DB_FILE_NAME: &str = "reservations.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Settings shared by every core entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling logs. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// Upper bound on waiting for a concurrent writer's lock.
    pub busy_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's
    /// value when set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = non_blank(lookup(ENV_DB_PATH)) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = non_blank(lookup(ENV_LOG_LEVEL)) {
            config.log_level = level;
        }
        config.log_dir = non_blank(lookup(ENV_LOG_DIR)).map(PathBuf::from);
        if let Some(raw) = non_blank(lookup(ENV_BUSY_TIMEOUT_MS)) {
            config.busy_timeout_ms = raw.trim().parse().map_err(|_| {
                format!("{ENV_BUSY_TIMEOUT_MS} must be a non-negative integer, got `{raw}`")
            })?;
        }
        Ok(config)
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
