//! Durable key-value storage.
//!
//! The cart and the identity resolver only ever see the [`KeyValueStore`]
//! trait: string keys mapped to string values, the same shape as a browser's
//! per-origin storage. Two backends are provided:
//!
//! - [`MemoryStore`] - process-local, for tests and ephemeral sessions
//! - [`FileStore`] - a JSON object on disk that survives restarts
//!
//! [`CartStorage`] layers JSON encoding and identity partitioning on top.

mod cart;
mod file;

pub use cart::{CartStorage, DecodeError, PartitionKey};
pub use file::FileStore;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

/// Keys written by the authentication flow and read by this crate.
pub mod keys {
    /// Raw session token (JWT).
    pub const TOKEN: &str = "token";

    /// Cached profile record (JSON).
    pub const USER: &str = "user";
}

/// Errors that can occur when reading or writing a key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object of strings.
    #[error("corrupt storage file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A previous holder of the store lock panicked.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A durable string-to-string store.
///
/// Implementations must be safe to share between every surface that holds a
/// [`crate::services::CartStore`] handle.
pub trait KeyValueStore: Send + Sync {
    /// Read the value at `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .remove(key);
        Ok(())
    }
}
