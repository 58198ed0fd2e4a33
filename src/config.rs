//! Engine configuration
//!
//! Loaded from an optional JSON file, then overridden by environment:
//! - `KITCHECK_DB`: database file path
//! - `KITCHECK_LOG`: log level (`trace` .. `error`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::default_db_path;

pub const DB_PATH_ENV: &str = "KITCHECK_DB";
pub const LOG_LEVEL_ENV: &str = "KITCHECK_LOG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration: file (if given) then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(DB_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
    }
}
