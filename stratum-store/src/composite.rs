//! Composite store: authoritative backend + cache behind one CRUD façade.
//!
//! Writes go to the authoritative store first, inside the enclosing
//! transaction; the identical cache update is deferred to commit time, so
//! a rolled-back transaction never dirties the cache. Reads are served
//! exclusively from the cache. Each mutation records a replayable event in
//! the transaction's batch.
//!
//! Read-after-write holds on the node that performed the write (the cache
//! update runs synchronously as part of the committing call); across nodes
//! the cache is only eventually consistent via the replication pipeline.

use crate::cache::{CacheInvalidate, MemoryCacheStore};
use crate::contract::EntityStore;
use crate::engine::{SqlEngine, TxContext};
use crate::error::{StorageError, StorageResult};
use crate::integrity::{PlannedUpdate, RemovalHandler, UpdateFlags, UpdateHandler};
use crate::lifecycle::Hydratable;
use crate::sql_store::SqlTableStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use stratum_types::{EntityRecord, MutationEvent};
use tracing::{debug, info};

/// One entity type's authoritative store and cache, combined.
pub struct CompositeStore<T> {
    engine: Arc<SqlEngine>,
    authoritative: SqlTableStore<T>,
    cache: Arc<MemoryCacheStore<T>>,
    removal_handlers: Vec<Arc<dyn RemovalHandler>>,
    update_handlers: Vec<Arc<dyn UpdateHandler<T>>>,
}

impl<T> CompositeStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates the store pair for `store` on the given engine.
    pub fn new(engine: Arc<SqlEngine>, store: impl Into<String>) -> Self {
        let authoritative = SqlTableStore::new(&engine, store);
        Self {
            engine,
            authoritative,
            cache: Arc::new(MemoryCacheStore::new()),
            removal_handlers: Vec::new(),
            update_handlers: Vec::new(),
        }
    }

    /// The store's stable name.
    pub fn name(&self) -> &str {
        self.authoritative.name()
    }

    /// Direct handle to the authoritative backend.
    pub fn authoritative(&self) -> &SqlTableStore<T> {
        &self.authoritative
    }

    /// Registers a removal handler. Registration happens at wiring time,
    /// before the store is shared; the list is immutable afterwards.
    pub fn add_removal_handler(&mut self, handler: Arc<dyn RemovalHandler>) {
        self.removal_handlers.push(handler);
    }

    /// Registers an update handler. Same wiring-time rule as removal
    /// handlers.
    pub fn add_update_handler(&mut self, handler: Arc<dyn UpdateHandler<T>>) {
        self.update_handlers.push(handler);
    }

    fn check_size(&self, key: &str, payload: &str) -> StorageResult<()> {
        let limit = self.engine.value_size_limit();
        if payload.len() > limit {
            return Err(StorageError::ValueTooLarge {
                key: key.to_string(),
                size: payload.len(),
                limit,
            });
        }
        Ok(())
    }

    fn check_removal(&self, row_id: i64, key: &str) -> StorageResult<()> {
        for handler in &self.removal_handlers {
            handler
                .pre_remove_check(row_id, key)
                .map_err(|reason| StorageError::IntegrityViolation {
                    name: key.to_string(),
                    reason,
                })?;
        }
        Ok(())
    }

    fn check_update(&self, update: &PlannedUpdate<T>) -> StorageResult<()> {
        let name = update
            .modified_name
            .clone()
            .unwrap_or_else(|| update.modified_id.to_string());
        for handler in &self.update_handlers {
            handler
                .pre_update_check(update)
                .map_err(|reason| StorageError::IntegrityViolation {
                    name: name.clone(),
                    reason,
                })?;
        }
        Ok(())
    }

    // ── Transaction-scoped mutations ─────────────────────────────

    /// Stores a new entity within the given transaction.
    pub fn create_tx(&self, ctx: &mut TxContext<'_>, key: &str, value: &T) -> StorageResult<()> {
        let payload = serde_json::to_string(value)?;
        self.check_size(key, &payload)?;
        let row_id = self
            .authoritative
            .create_raw_in(ctx.connection(), key, &payload)?;
        ctx.record(MutationEvent::create(
            self.name(),
            row_id,
            EntityRecord::new(key, payload),
        ));
        let cache = Arc::clone(&self.cache);
        let key = key.to_string();
        let value = value.clone();
        ctx.after_commit(move || cache.put(&key, value));
        Ok(())
    }

    /// Replaces an entity's value within the given transaction.
    pub fn update_tx(&self, ctx: &mut TxContext<'_>, key: &str, value: &T) -> StorageResult<()> {
        let payload = serde_json::to_string(value)?;
        self.check_size(key, &payload)?;
        let (row_id, old_value) = self.authoritative.row_of(ctx.connection(), key)?;
        self.check_update(&PlannedUpdate {
            modified_id: row_id,
            modified_name: Some(key.to_string()),
            old_value,
            new_value: value.clone(),
            flags: UpdateFlags::content(),
        })?;
        self.authoritative
            .set_payload_in(ctx.connection(), row_id, &payload)?;
        ctx.record(MutationEvent::update(
            self.name(),
            row_id,
            EntityRecord::new(key, payload),
        ));
        let cache = Arc::clone(&self.cache);
        let key = key.to_string();
        let value = value.clone();
        ctx.after_commit(move || cache.put(&key, value));
        Ok(())
    }

    /// Removes an entity within the given transaction, after consulting
    /// every removal handler.
    pub fn delete_tx(&self, ctx: &mut TxContext<'_>, key: &str) -> StorageResult<()> {
        let row_id = self
            .authoritative
            .id_of(ctx.connection(), key)?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        self.check_removal(row_id, key)?;
        self.authoritative.delete_row_in(ctx.connection(), row_id)?;
        ctx.record(MutationEvent::delete(self.name(), row_id, key));
        let cache = Arc::clone(&self.cache);
        let key = key.to_string();
        ctx.after_commit(move || cache.remove(&key));
        Ok(())
    }

    /// Moves an entity to a new key, value preserved, within the given
    /// transaction. Update handlers see the rename flag and the new key.
    pub fn rename_tx(&self, ctx: &mut TxContext<'_>, from: &str, to: &str) -> StorageResult<()> {
        let (row_id, current) = self.authoritative.row_of(ctx.connection(), from)?;
        if self.authoritative.exists_in(ctx.connection(), to)? {
            return Err(StorageError::Conflict(to.to_string()));
        }
        self.check_update(&PlannedUpdate {
            modified_id: row_id,
            modified_name: Some(to.to_string()),
            old_value: current.clone(),
            new_value: current,
            flags: UpdateFlags::rename(),
        })?;
        self.authoritative.set_key_in(ctx.connection(), row_id, to)?;
        ctx.record(MutationEvent::rename(self.name(), row_id, from, to));
        let cache = Arc::clone(&self.cache);
        let from = from.to_string();
        let to = to.to_string();
        ctx.after_commit(move || cache.rename_key(&from, &to));
        Ok(())
    }

    /// Renames an entity in a transaction of its own.
    pub fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        self.engine
            .with_transaction(|ctx| self.rename_tx(ctx, from, to))
    }

    // ── Cache refresh surface ────────────────────────────────────
    //
    // Used by the replication pipeline when applying batches and by
    // hydration. These touch only the derived cache, never the
    // authoritative store.

    /// Inserts or replaces a cache entry.
    pub fn refresh_put(&self, key: &str, value: T) {
        self.cache.put(key, value);
    }

    /// Drops a cache entry.
    pub fn refresh_remove(&self, key: &str) {
        self.cache.remove(key);
    }

    /// Moves a cache entry to a new key.
    pub fn refresh_rename(&self, from: &str, to: &str) {
        self.cache.rename_key(from, to);
    }
}

impl<T> EntityStore<T> for CompositeStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn create(&self, key: &str, value: &T) -> StorageResult<()> {
        self.engine
            .with_transaction(|ctx| self.create_tx(ctx, key, value))
    }

    fn update(&self, key: &str, value: &T) -> StorageResult<()> {
        self.engine
            .with_transaction(|ctx| self.update_tx(ctx, key, value))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.engine.with_transaction(|ctx| self.delete_tx(ctx, key))
    }

    fn get(&self, key: &str) -> StorageResult<T> {
        self.cache.get(key)
    }

    fn get_all(&self) -> StorageResult<HashMap<String, T>> {
        self.cache.get_all()
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        self.cache.exists(key)
    }
}

impl<T> Hydratable for CompositeStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn store_name(&self) -> &str {
        self.name()
    }

    /// Replaces the cache with the authoritative contents.
    fn hydrate(&self) -> StorageResult<()> {
        let all = self
            .engine
            .read(|conn| self.authoritative.get_all_in(conn))?;
        let count = all.len();
        self.cache.replace_all(all);
        info!(store = self.name(), entities = count, "hydrated cache");
        Ok(())
    }
}

impl<T> CacheInvalidate for CompositeStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn invalidate(&self) {
        debug!(store = self.name(), "invalidating cache");
        self.cache.clear();
    }
}
