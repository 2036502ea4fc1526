//! Key-value storage scopes.
//!
//! The credential store writes to two scopes: a session-scoped one that
//! dies with the process and a durable one.  Both are plain string
//! key-value maps; the medium behind them is up to the embedder.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A string key-value store.
///
/// Writes are fire-and-forget, like browser storage: an implementation
/// that can fail (disk, keychain) logs and carries on.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: &str);
    /// Delete a value; absent keys are ignored.
    fn remove(&self, key: &str);
}

/// In-process store, used for the session scope and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
