//! Persisted is-logged-in flag.

use crate::{MemoryStore, StateStore, StoreKeys, StoreResult};
use std::sync::Arc;
use tracing::debug;

/// The single persisted boolean the sign-in flows maintain.
///
/// Constructed over an injected store and handed to each flow
/// explicitly; reads fall back to `false` when the key is absent.
#[derive(Clone)]
pub struct LoginFlag {
    store: Arc<dyn StateStore>,
}

impl LoginFlag {
    /// Create a flag over the given store backend.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Create a flag over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Whether a user is currently signed in. Absent key reads as false.
    pub fn is_logged_in(&self) -> StoreResult<bool> {
        Ok(self.store.get(StoreKeys::IS_LOGGED_IN)?.as_deref() == Some("true"))
    }

    /// Record the signed-in state.
    pub fn set_logged_in(&self, value: bool) -> StoreResult<()> {
        self.store
            .set(StoreKeys::IS_LOGGED_IN, if value { "true" } else { "false" })?;
        debug!(logged_in = value, "Login flag updated");
        Ok(())
    }

    /// Remove the flag entirely.
    pub fn clear(&self) -> StoreResult<()> {
        self.store.delete(StoreKeys::IS_LOGGED_IN)?;
        debug!("Login flag cleared");
        Ok(())
    }
}
