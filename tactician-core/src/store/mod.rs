//! Persistence collaborator
//!
//! Components persist JSON blobs under string keys through a
//! [`KeyValueStore`]. Two implementations are provided:
//! - [`MemoryStore`] for tests and throwaway sessions
//! - [`SqliteStore`] for durable state in the XDG data directory

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key-value persistence for JSON blobs.
///
/// Reading a missing key initializes it to `{}`. Blobs that fail to parse
/// are logged and read as `{}`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Value>;
    fn set(&self, key: &str, value: &Value) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Value> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Value> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Decode a stored blob, falling back to an empty object.
pub(crate) fn decode_blob(key: &str, raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Stored value is corrupt, treating as empty");
            empty()
        }
    }
}

pub(crate) fn empty() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Volatile store holding raw JSON text, like browser local storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store text as-is, without validating it as JSON
    pub fn insert_raw(&self, key: &str, raw: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), raw.to_string());
        Ok(())
    }

    pub fn raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Value> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(raw) => Ok(decode_blob(key, raw)),
            None => {
                entries.insert(key.to_string(), "{}".to_string());
                Ok(empty())
            }
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.lock()?.insert(key.to_string(), raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_key_initialized() {
        let store = MemoryStore::new();
        assert_eq!(store.get("progress").unwrap(), json!({}));
        assert_eq!(store.raw("progress").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set("favorites", &json!({"abc": true})).unwrap();
        assert_eq!(store.get("favorites").unwrap(), json!({"abc": true}));
    }

    #[test]
    fn test_corrupt_blob_reads_empty() {
        let store = MemoryStore::new();
        store.insert_raw("progress", "{not json").unwrap();
        assert_eq!(store.get("progress").unwrap(), json!({}));
    }

    #[test]
    fn test_shared_through_arc() {
        let store = Arc::new(MemoryStore::new());
        let handle = Arc::clone(&store);
        handle.set("k", &json!({"a": 1})).unwrap();
        assert_eq!(store.get("k").unwrap(), json!({"a": 1}));
    }
}
