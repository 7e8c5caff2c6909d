//! Registry configuration.
//!
//! # Responsibility
//! - Carry the store location injected into `Registry`.
//! - Resolve process-level settings from the environment for binaries.

use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "ECOREG_DB_PATH";
pub const LOG_DIR_ENV: &str = "ECOREG_LOG_DIR";
pub const LOG_LEVEL_ENV: &str = "ECOREG_LOG_LEVEL";
pub const DEFAULT_DB_FILE_NAME: &str = "eco.db";

/// Store location for a `Registry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    db_path: PathBuf,
}

impl RegistryConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Reads `ECOREG_DB_PATH`, falling back to `eco.db` in the working directory.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup(DB_PATH_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DB_FILE_NAME.to_string());
        Self::new(db_path)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Logging settings resolved from `ECOREG_LOG_DIR` / `ECOREG_LOG_LEVEL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub log_dir: String,
}

impl LogSettings {
    /// Returns `None` when no log directory is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let log_dir = lookup(LOG_DIR_ENV).filter(|value| !value.trim().is_empty())?;
        let level = lookup(LOG_LEVEL_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| crate::logging::default_log_level().to_string());
        Some(Self { level, log_dir })
    }
}
