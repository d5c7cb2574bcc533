//! Local state persistence for the Doorman sign-in engine.
//!
//! This crate provides:
//! - The `StateStore` trait the engine persists through
//! - An in-memory store and a JSON-file store
//! - `LoginFlag`, the injected is-logged-in boolean the flows write on
//!   sign-in success and clear on sign-out

mod file;
mod flag;
mod keys;
mod memory;
mod traits;

pub use file::JsonFileStore;
pub use flag::LoginFlag;
pub use keys::StoreKeys;
pub use memory::MemoryStore;
pub use traits::StateStore;

use thiserror::Error;

/// Error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend-specific store error
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
