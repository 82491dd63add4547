//! Persistent daemon state: the item order plus the hidden-item bookkeeping.
//!
//! Persistence is best-effort. A missing or corrupt state file falls back to
//! defaults, and save failures are logged rather than failing the operation
//! that triggered them; a full disk should never block a drag.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::ItemConfig;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    items: Vec<ItemConfig>,
    #[serde(default)]
    hidden_items: BTreeSet<String>,
    #[serde(default)]
    original_positions: BTreeMap<String, f64>,
}

pub struct SettingsStore {
    path: PathBuf,
    state: PersistedState,
}

impl SettingsStore {
    pub fn open_default() -> Result<Self> {
        let dir = dirs::config_dir()
            .context("could not determine config directory")?
            .join("perch");
        Ok(Self::open(dir.join("state.json")))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("ignoring corrupt state file {:?}: {}", path, e);
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        };
        Self { path, state }
    }

    pub fn item_configs(&self) -> Vec<ItemConfig> {
        self.state.items.clone()
    }

    pub fn set_item_configs(&mut self, configs: Vec<ItemConfig>) {
        self.state.items = configs;
        self.save_logged();
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.state.hidden_items.contains(name)
    }

    pub fn original_position(&self, name: &str) -> Option<f64> {
        self.state.original_positions.get(name).copied()
    }

    /// Mark an item hidden, remembering where it was so a later show can put
    /// it back.
    pub fn record_hidden(&mut self, name: &str, original_x: f64) {
        self.state.hidden_items.insert(name.to_string());
        self.state
            .original_positions
            .insert(name.to_string(), original_x);
        self.save_logged();
    }

    pub fn record_shown(&mut self, name: &str) {
        self.state.hidden_items.remove(name);
        self.state.original_positions.remove(name);
        self.save_logged();
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write {:?}", self.path))?;
        Ok(())
    }

    fn save_logged(&self) {
        if let Err(e) = self.save() {
            tracing::warn!("failed to persist state: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> SettingsStore {
        let path = std::env::temp_dir().join(format!(
            "perch-store-test-{}-{}.json",
            std::process::id(),
            tag
        ));
        let _ = std::fs::remove_file(&path);
        SettingsStore::open(path)
    }

    #[test]
    fn test_round_trips_hidden_state() {
        let mut store = temp_store("hidden");
        store.record_hidden("Slack", 312.0);

        let reloaded = SettingsStore::open(&store.path);
        assert!(reloaded.is_hidden("Slack"));
        assert_eq!(reloaded.original_position("Slack"), Some(312.0));

        let _ = std::fs::remove_file(&store.path);
    }

    #[test]
    fn test_record_shown_clears_both_maps() {
        let mut store = temp_store("shown");
        store.record_hidden("Slack", 312.0);
        store.record_shown("Slack");

        assert!(!store.is_hidden("Slack"));
        assert_eq!(store.original_position("Slack"), None);

        let _ = std::fs::remove_file(&store.path);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!(
            "perch-store-test-{}-corrupt.json",
            std::process::id()
        ));
        std::fs::write(&path, "not json {{{").unwrap();

        let store = SettingsStore::open(&path);
        assert!(store.item_configs().is_empty());
        assert!(!store.is_hidden("Slack"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let store = temp_store("missing");
        assert!(store.item_configs().is_empty());
    }
}
