//! Configuration file support for surveyctl
//!
//! Config is loaded from `~/.surveyctl/config.toml` (or `$SURVEYCTL_HOME/config.toml`).
//! Environment variables override config file settings.

use crate::logging;
use crate::storage::surveyctl_dir;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Remote survey store
    pub store: StoreConfig,

    /// Log file handling
    pub logging: LoggingConfig,
}

/// Remote store connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// GraphQL endpoint (default: http://localhost:4000/graphql)
    pub endpoint: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/graphql".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Days of log files to keep (default: 7)
    pub retain_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { retain_days: 7 }
    }
}

impl Config {
    /// Path of the config file
    pub fn path() -> Option<PathBuf> {
        surveyctl_dir().ok().map(|dir| dir.join("config.toml"))
    }

    /// Load from the default location with environment overrides applied.
    /// A missing file yields defaults; a malformed one is logged and ignored.
    pub fn load() -> Self {
        let mut config = match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                logging::warn(&format!("Ignoring config file: {:#}", e));
                Self::default()
            }),
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("SURVEYCTL_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.store.endpoint = endpoint.trim().to_string();
            }
        }
    }
}
