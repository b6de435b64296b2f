//! Persistence for the prompt library.
//!
//! Everything is held in a flat, string-keyed area where each key stores one
//! JSON document. [`KeyValueStore`] is the raw area; [`JsonStore`] layers typed,
//! failure-tolerant reads and logged writes on top of it.

mod file_store;
mod json_store;
pub mod keys;
mod memory_store;

pub use file_store::{FileStore, SHELF_DIR};
pub use json_store::JsonStore;
pub use memory_store::MemoryStore;

use crate::error::Result;

/// A string-keyed persistent area holding one document per key.
pub trait KeyValueStore {
    /// Read a document. An absent key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a document, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a document. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
