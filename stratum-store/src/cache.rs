//! In-memory cache backend.
//!
//! The cache is a derived, rebuildable mirror of the authoritative store.
//! It holds deserialized entities keyed by their store key and provides
//! the per-key atomicity the composite store relies on.

use crate::contract::EntityStore;
use crate::error::{StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Invalidation hook exposed by every store that keeps a derived in-memory
/// copy. The lifecycle manager invalidates all registered caches together
/// during a reset.
pub trait CacheInvalidate: Send + Sync {
    /// Drops the derived copy entirely.
    fn invalidate(&self);
}

/// In-memory mirror for entities of type `T`.
pub struct MemoryCacheStore<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T: Clone> MemoryCacheStore<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the entry for `key`.
    pub fn put(&self, key: &str, value: T) {
        self.entries.write().unwrap().insert(key.to_string(), value);
    }

    /// Removes the entry for `key`, if present.
    pub fn remove(&self, key: &str) {
        self.entries.write().unwrap().remove(key);
    }

    /// Moves the entry stored under `from` to `to`.
    pub fn rename_key(&self, from: &str, to: &str) {
        let mut entries = self.entries.write().unwrap();
        if let Some(value) = entries.remove(from) {
            entries.insert(to.to_string(), value);
        }
    }

    /// Replaces the whole cache contents. Used by hydration.
    pub fn replace_all(&self, all: HashMap<String, T>) {
        *self.entries.write().unwrap() = all;
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

impl<T: Clone> Default for MemoryCacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityStore<T> for MemoryCacheStore<T>
where
    T: Clone + Send + Sync,
{
    fn create(&self, key: &str, value: &T) -> StorageResult<()> {
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(key) {
            return Err(StorageError::Conflict(key.to_string()));
        }
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn update(&self, key: &str, value: &T) -> StorageResult<()> {
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(key) {
            Some(slot) => {
                *slot = value.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().unwrap();
        match entries.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn get(&self, key: &str) -> StorageResult<T> {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn get_all(&self) -> StorageResult<HashMap<String, T>> {
        Ok(self.entries.read().unwrap().clone())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.read().unwrap().contains_key(key))
    }
}

impl<T> CacheInvalidate for MemoryCacheStore<T>
where
    T: Clone + Send + Sync,
{
    fn invalidate(&self) {
        debug!("invalidating cache");
        self.clear();
    }
}
