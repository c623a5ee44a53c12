use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File operation error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Malformed store content: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Key-value capability for cross-cutting client state (auth token, recently
/// viewed products, ...), injected into whoever needs it.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process local store, nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            values: DashMap::new(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store persisted as a single json object, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            debug!("store {} does not exist yet", path.display());
            BTreeMap::new()
        };

        Ok(FileStore {
            path,
            values: RwLock::new(values),
        })
    }

    /// Applies `change` to a copy, which only becomes visible once it is on disk.
    fn update<F: FnOnce(&mut BTreeMap<String, String>) -> bool>(
        &self,
        change: F,
    ) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        let mut staged = values.clone();
        if !change(&mut staged) {
            return Ok(());
        }

        self.persist(&staged).inspect_err(|err| {
            warn!("could not persist store {}: {}", self.path.display(), err);
        })?;
        *values = staged;
        Ok(())
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.update(|values| {
            values.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|values| values.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{FileStore, KeyValueStore, MemoryStore};
    use std::fs;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    #[test]
    fn memory_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("token"), None);

        store.set("token", String::from("abc")).unwrap();
        assert_eq!(store.get("token"), Some(String::from("abc")));

        store.remove("token").unwrap();
        assert_eq!(store.get("token"), None);
    }

    #[test]
    fn file_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("token", String::from("abc")).unwrap();
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("token"), Some(String::from("abc")));
    }

    #[test]
    fn file_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        assert!(FileStore::open(&path).is_err());
    }

    #[test]
    #[traced_test]
    fn failed_write_changes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path).unwrap();
        store.set("token", String::from("old")).unwrap();

        // a directory in place of the file makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.set("token", String::from("new")).is_err());
        assert_eq!(store.get("token"), Some(String::from("old")));

        assert!(store.remove("token").is_err());
        assert_eq!(store.get("token"), Some(String::from("old")));
        assert!(logs_contain("could not persist store"));
    }

    #[test]
    fn unwritable_path_keeps_store_empty() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let store = FileStore::open(blocker.join("store.json")).unwrap();
        assert!(store.set("token", String::from("abc")).is_err());
        assert_eq!(store.get("token"), None);
    }

    #[test]
    fn file_empty_is_fine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything"), None);
    }
}
