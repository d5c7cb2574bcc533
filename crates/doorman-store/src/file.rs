//! JSON-file store backend.

use crate::{StateStore, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Store backed by a single JSON object file.
///
/// The file holds a flat string-to-string map. A missing file reads as an
/// empty store; the file and its parent directory are created on the
/// first write.
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes the read-modify-write cycle.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> StoreResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path)?;
        serde_json::from_str(&text).map_err(|e| StoreError::Encoding(e.to_string()))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text =
            serde_json::to_string_pretty(map).map_err(|e| StoreError::Encoding(e.to_string()))?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_map()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map()?;
        let removed = map.remove(key).is_some();
        if removed {
            self.write_map(&map)?;
        }
        Ok(removed)
    }
}
