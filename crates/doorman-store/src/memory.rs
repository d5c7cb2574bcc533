//! In-memory store backend.

use crate::{StateStore, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Map-backed store. Nothing survives the process; useful for tests and
/// for embedders that keep the login flag session-scoped.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut data = self.data.lock().unwrap();
        Ok(data.remove(key).is_some())
    }
}
