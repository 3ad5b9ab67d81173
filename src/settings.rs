//! Remembered operator state.
//!
//! A flat key/value file loaded on start and rewritten on every change.
//! Holds the write credential and the last toggle-target form name.

use crate::auth::Credential;
use crate::logging;
use crate::storage;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const AUTHORIZATION_KEY: &str = "authorization-upload-survey";
pub const TOGGLE_TARGET_KEY: &str = "toggle_form_id";

#[derive(Debug, Default)]
pub struct Settings {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl Settings {
    /// Load from `~/.surveyctl/state.json`
    pub fn load() -> Result<Self> {
        let path = storage::surveyctl_dir()?.join("state.json");
        Ok(Self::load_from(path))
    }

    /// Load from `path`; a missing or unreadable file starts empty.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = if path.exists() {
            storage::read_json(&path).unwrap_or_else(|e| {
                logging::warn(&format!(
                    "Could not read remembered state {}: {}",
                    path.display(),
                    e
                ));
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Self {
            path: Some(path),
            values,
        }
    }

    /// Settings that are never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.get(key) == value {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    pub fn authorization(&self) -> Credential {
        Credential::new(self.get(AUTHORIZATION_KEY))
    }

    pub fn set_authorization(&mut self, token: &str) -> Result<()> {
        self.set(AUTHORIZATION_KEY, token)
    }

    pub fn toggle_target(&self) -> &str {
        self.get(TOGGLE_TARGET_KEY)
    }

    pub fn set_toggle_target(&mut self, name: &str) -> Result<()> {
        self.set(TOGGLE_TARGET_KEY, name)
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        storage::write_json(path, &self.values)
            .with_context(|| format!("Failed to save remembered state to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut settings = Settings::load_from(&path);
        assert!(settings.authorization().is_empty());
        settings.set_authorization("abc123").unwrap();
        settings.set_toggle_target("Movilidad urbana").unwrap();

        let reloaded = Settings::load_from(&path);
        assert_eq!(reloaded.authorization().as_str(), "abc123");
        assert_eq!(reloaded.toggle_target(), "Movilidad urbana");

        let raw: BTreeMap<String, String> = storage::read_json(&path).unwrap();
        assert_eq!(raw.get(AUTHORIZATION_KEY).map(String::as_str), Some("abc123"));
        assert_eq!(raw.get(TOGGLE_TARGET_KEY).map(String::as_str), Some("Movilidad urbana"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.toggle_target(), "");
    }

    #[test]
    fn test_in_memory_never_touches_disk() {
        let mut settings = Settings::in_memory();
        settings.set_authorization("tok").unwrap();
        assert_eq!(settings.authorization().as_str(), "tok");
        assert!(settings.path().is_none());
    }
}
