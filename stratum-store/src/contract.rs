//! The generic entity store contract.
//!
//! Every entity-specific store — authoritative, cache, or composite —
//! implements the same create/read/update/delete surface. Entities are
//! opaque values identified by a string key unique within the store.

use crate::error::StorageResult;
use std::collections::HashMap;

/// Create/read/update/delete over one entity type.
///
/// A key, once created, maps to exactly one logical entity until deleted.
/// `create` fails with `Conflict` if the key exists; `update` and `delete`
/// fail with `NotFound` if it does not; `get` on a missing key fails with
/// `NotFound` rather than returning a default. Concurrency safety beyond
/// per-call atomicity is the caller's responsibility.
pub trait EntityStore<T>: Send + Sync {
    /// Stores a new entity under `key`.
    fn create(&self, key: &str, value: &T) -> StorageResult<()>;

    /// Replaces the entity stored under `key`.
    fn update(&self, key: &str, value: &T) -> StorageResult<()>;

    /// Removes the entity stored under `key`.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Returns the entity stored under `key`.
    fn get(&self, key: &str) -> StorageResult<T>;

    /// Returns all entities in the store, keyed.
    fn get_all(&self) -> StorageResult<HashMap<String, T>>;

    /// True if an entity is stored under `key`.
    fn exists(&self, key: &str) -> StorageResult<bool>;
}
