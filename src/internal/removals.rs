use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Durable set of dismissed story ids, one record per tab.
///
/// `load` never fails outward: unreadable or corrupt records degrade to an
/// empty set. `save` is synchronous and best-effort; failures are logged.
pub trait RemovalStore: Send + Sync {
    fn load(&self, tab_id: &str) -> HashSet<String>;
    fn save(&self, tab_id: &str, ids: &HashSet<String>);
}

/// Ids written by older versions may be bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredId {
    Text(String),
    Number(u64),
}

impl From<StoredId> for String {
    fn from(id: StoredId) -> Self {
        match id {
            StoredId::Text(s) => s,
            StoredId::Number(n) => n.to_string(),
        }
    }
}

/// Stores each tab's removal set as a JSON array in `<dir>/removed-<tab>.json`.
#[derive(Debug, Clone)]
pub struct JsonRemovalStore {
    dir: PathBuf,
}

impl JsonRemovalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Uses `data_dir` when given, otherwise `<config dir>/tui-story-deck`.
    /// `None` when neither is available.
    pub fn resolve(data_dir: Option<&Path>, config_dir: Option<PathBuf>) -> Option<Self> {
        data_dir
            .map(Path::to_path_buf)
            .or_else(|| config_dir.map(|dir| dir.join("tui-story-deck")))
            .map(Self::new)
    }

    pub fn path_for(&self, tab_id: &str) -> PathBuf {
        let safe: String = tab_id
            .chars()
            .map(|c| match c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                true => c,
                false => '_',
            })
            .collect();
        self.dir.join(format!("removed-{safe}.json"))
    }

    fn try_load(&self, tab_id: &str) -> Result<HashSet<String>> {
        let path = self.path_for(tab_id);
        if !path.exists() {
            return Ok(HashSet::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read removal file {}", path.display()))?;
        let ids: Vec<StoredId> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse removal file {}", path.display()))?;
        Ok(ids.into_iter().map(String::from).collect())
    }

    fn try_save(&self, tab_id: &str, ids: &HashSet<String>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;
        // Sorted so the file is stable across writes.
        let ordered: BTreeSet<&String> = ids.iter().collect();
        let content =
            serde_json::to_string_pretty(&ordered).context("Failed to serialize removal set")?;
        let path = self.path_for(tab_id);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write removal file {}", path.display()))?;
        Ok(())
    }
}

impl RemovalStore for JsonRemovalStore {
    fn load(&self, tab_id: &str) -> HashSet<String> {
        match self.try_load(tab_id) {
            Ok(ids) => {
                info!(tab = tab_id, count = ids.len(), "Loaded removal set");
                ids
            }
            Err(e) => {
                warn!(tab = tab_id, "Removal set unavailable, starting empty: {e:#}");
                HashSet::new()
            }
        }
    }

    fn save(&self, tab_id: &str, ids: &HashSet<String>) {
        match self.try_save(tab_id, ids) {
            Ok(()) => info!(tab = tab_id, count = ids.len(), "Saved removal set"),
            Err(e) => warn!(tab = tab_id, "Failed to persist removal set: {e:#}"),
        }
    }
}

/// Opens the store for this session. Without any usable directory removals
/// are kept in memory and the session still starts.
pub fn open_store(data_dir: Option<&Path>) -> Arc<dyn RemovalStore> {
    store_for(data_dir, dirs::config_dir())
}

fn store_for(data_dir: Option<&Path>, config_dir: Option<PathBuf>) -> Arc<dyn RemovalStore> {
    match JsonRemovalStore::resolve(data_dir, config_dir) {
        Some(store) => {
            info!(dir = %store.dir.display(), "Resolved removal store directory");
            Arc::new(store)
        }
        None => {
            warn!("No config directory found; removals will not outlive this session");
            Arc::new(MemoryRemovalStore::new())
        }
    }
}

/// Process-local store, used in tests and when no data directory exists.
#[derive(Debug, Default)]
pub struct MemoryRemovalStore {
    sets: Mutex<HashMap<String, HashSet<String>>>,
}

impl MemoryRemovalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemovalStore for MemoryRemovalStore {
    fn load(&self, tab_id: &str) -> HashSet<String> {
        self.sets
            .lock()
            .ok()
            .and_then(|sets| sets.get(tab_id).cloned())
            .unwrap_or_default()
    }

    fn save(&self, tab_id: &str, ids: &HashSet<String>) {
        if let Ok(mut sets) = self.sets.lock() {
            sets.insert(tab_id.to_string(), ids.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRemovalStore::new(dir.path());

        let ids: HashSet<String> = ["1", "abc"].iter().map(|s| s.to_string()).collect();
        store.save("hackernews", &ids);

        let reopened = JsonRemovalStore::new(dir.path());
        assert_eq!(reopened.load("hackernews"), ids);
        assert!(reopened.load("other").is_empty());
    }

    #[test]
    fn test_load_accepts_numeric_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRemovalStore::new(dir.path());
        fs::write(store.path_for("hackernews"), "[123, \"456\"]").unwrap();

        let ids = store.load("hackernews");
        assert!(ids.contains("123"));
        assert!(ids.contains("456"));
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRemovalStore::new(dir.path());
        fs::write(store.path_for("feed"), "{not json").unwrap();

        assert!(store.load("feed").is_empty());
    }

    #[test]
    fn test_save_into_unwritable_location_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // A regular file where the directory should be.
        let store = JsonRemovalStore::new(blocker.join("nested"));

        let ids: HashSet<String> = ["1".to_string()].into_iter().collect();
        store.save("hackernews", &ids);
        assert!(store.load("hackernews").is_empty());
    }

    #[test]
    fn test_resolve_prefers_data_dir_over_config_dir() {
        let store = JsonRemovalStore::resolve(Some(Path::new("/data")), Some("/cfg".into())).unwrap();
        assert_eq!(store.path_for("hn"), Path::new("/data/removed-hn.json"));

        let store = JsonRemovalStore::resolve(None, Some("/cfg".into())).unwrap();
        assert_eq!(
            store.path_for("hn"),
            Path::new("/cfg/tui-story-deck/removed-hn.json")
        );

        assert!(JsonRemovalStore::resolve(None, None).is_none());
    }

    #[test]
    fn test_missing_config_dir_falls_back_to_memory() {
        let store = store_for(None, None);

        let ids: HashSet<String> = ["7".to_string()].into_iter().collect();
        store.save("hackernews", &ids);
        assert_eq!(store.load("hackernews"), ids);
        assert!(store.load("feed").is_empty());
    }

    #[test]
    fn test_tab_ids_are_sanitized_for_file_names() {
        let store = JsonRemovalStore::new("/tmp/x");
        let path = store.path_for("../evil tab");
        assert_eq!(path.file_name().unwrap(), "removed-___evil_tab.json");
    }
}
