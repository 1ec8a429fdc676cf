//! Durable key/value storage.
//!
//! The browser build persists values in `window.localStorage`; native
//! builds and tests use the file-backed or in-memory stores defined here.
//! Writes are last-write-wins; nothing in agrokart needs stronger
//! guarantees from this layer.

use parking_lot::Mutex;
use rootcause::prelude::Report;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::StorageError;

/// A string-keyed store of string values that survives reloads.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ReadFailed` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::WriteFailed` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), Report<StorageError>>;

    /// Removes a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::WriteFailed` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), Report<StorageError>>;
}

/// Process-local store. Values are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Report<StorageError>> {
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Report<StorageError>> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every write rewrites the whole file; the store is meant for a handful
/// of small values.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_all(&self, key: &str) -> Result<BTreeMap<String, String>, Report<StorageError>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    key: key.to_string(),
                    details: e.to_string(),
                }
                .into());
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            StorageError::ReadFailed {
                key: key.to_string(),
                details: format!("corrupt store {}: {e}", self.path.display()),
            }
            .into()
        })
    }

    fn write_all(
        &self,
        key: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<(), Report<StorageError>> {
        let write_failed = |details: String| StorageError::WriteFailed {
            key: key.to_string(),
            details,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(values).map_err(|e| write_failed(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        let _guard = self.lock.lock();
        Ok(self.read_all(key)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Report<StorageError>> {
        let _guard = self.lock.lock();
        let mut values = self.read_all(key)?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(key, &values)
    }

    fn remove(&self, key: &str) -> Result<(), Report<StorageError>> {
        let _guard = self.lock.lock();
        let mut values = self.read_all(key)?;
        if values.remove(key).is_some() {
            self.write_all(key, &values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("userRole").unwrap(), None);

        store.set("userRole", "vendor").unwrap();
        assert_eq!(store.get("userRole").unwrap().as_deref(), Some("vendor"));

        store.set("userRole", "customer").unwrap();
        assert_eq!(store.get("userRole").unwrap().as_deref(), Some("customer"));

        store.remove("userRole").unwrap();
        store.remove("userRole").unwrap();
        assert_eq!(store.get("userRole").unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("storage.json");

        FileStore::new(&path).set("userRole", "delivery_partner").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("userRole").unwrap().as_deref(),
            Some("delivery_partner")
        );
    }

    #[test]
    fn file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("userRole").unwrap(), None);
        store.remove("userRole").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("storage.json"));
        store.set("userRole", "vendor").unwrap();
        store.set("other", "value").unwrap();
        store.remove("userRole").unwrap();

        assert_eq!(store.get("userRole").unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get("userRole").is_err());
    }
}
