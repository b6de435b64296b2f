use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::KeyValueStore;
use crate::error::{Result, ShelfError};

/// Typed JSON view over a [`KeyValueStore`].
///
/// Reads never fail: a missing or unreadable document comes back as the
/// type's default. Writes report failure as [`ShelfError::Storage`] after
/// logging it, and never panic.
#[derive(Debug)]
pub struct JsonStore<S> {
    backend: S,
}

impl<S: KeyValueStore> JsonStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Load `key`, falling back to `T::default()` when absent or unreadable.
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.load_opt(key).unwrap_or_default()
    }

    /// Load `key`, or `None` when it is absent or unreadable.
    pub fn load_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.load_value(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(key, error = %e, "stored document has an unexpected shape, using default");
                None
            }
        }
    }

    /// Load `key` as untyped JSON.
    pub fn load_value(&self, key: &str) -> Option<Value> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "no stored document");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read stored document, using default");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "stored document is not valid JSON, using default");
                None
            }
        }
    }

    /// Serialize `value` and write it under `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|e| {
            error!(key, error = %e, "failed to serialize document");
            ShelfError::Storage(format!("Failed to serialize '{}': {}", key, e))
        })?;
        self.save_raw(key, &json)
    }

    /// Raw document text, with read errors propagated.
    pub fn raw(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(key)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        debug!(key, "removing document");
        self.backend.remove(key).map_err(|e| {
            error!(key, error = %e, "failed to remove document");
            ShelfError::Storage(format!("Failed to remove '{}': {}", key, e))
        })
    }

    pub fn save_raw(&self, key: &str, json: &str) -> Result<()> {
        debug!(key, bytes = json.len(), "writing document");
        self.backend.set(key, json).map_err(|e| {
            error!(key, error = %e, "failed to persist document");
            match e {
                ShelfError::Storage(msg) => ShelfError::Storage(msg),
                other => ShelfError::Storage(format!("Failed to write '{}': {}", key, other)),
            }
        })
    }
}
