//! Startup hydration and administrative reset operations.
//!
//! The manager owns the boot sequence (optional wipe, then cache hydration
//! in dependency order) and the operator-facing reset/wipe/cleanup calls.
//! Hydration order matters: reference data a store depends on (type
//! registries and the like) must be registered before its dependents.

use crate::cache::CacheInvalidate;
use crate::config::StorageConfig;
use crate::engine::SqlEngine;
use crate::error::StorageResult;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// A store whose cache can be (re)populated from the authoritative engine.
pub trait Hydratable: Send + Sync {
    /// The store's stable name, for logs and diagnostics.
    fn store_name(&self) -> &str;

    /// Replaces the derived cache with the authoritative contents.
    fn hydrate(&self) -> StorageResult<()>;
}

/// Whether the cheap wipe path is available yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResetState {
    NotYetReset,
    Ready,
}

/// Orchestrates startup hydration and administrative maintenance.
pub struct LifecycleManager {
    engine: Arc<SqlEngine>,
    hydration_order: Vec<Arc<dyn Hydratable>>,
    caches: Vec<Arc<dyn CacheInvalidate>>,
    reset_state: Mutex<ResetState>,
}

impl LifecycleManager {
    /// Creates a manager with no registered stores.
    pub fn new(engine: Arc<SqlEngine>) -> Self {
        Self {
            engine,
            hydration_order: Vec::new(),
            caches: Vec::new(),
            reset_state: Mutex::new(ResetState::NotYetReset),
        }
    }

    /// Registers a store for startup hydration. Registration order is
    /// dependency order: register reference data before its dependents.
    pub fn register_hydratable(&mut self, store: Arc<dyn Hydratable>) {
        self.hydration_order.push(store);
    }

    /// Registers a cache to be invalidated by reset operations.
    pub fn register_cache(&mut self, cache: Arc<dyn CacheInvalidate>) {
        self.caches.push(cache);
    }

    /// One-time, blocking boot step: optional startup wipe, then cache
    /// hydration in dependency order. A failure here is fatal to startup —
    /// the system must not accept requests on a partially hydrated cache.
    pub fn initialize(&self, config: &StorageConfig) -> StorageResult<()> {
        if config.wipe_db_at_startup {
            info!("wipe_db_at_startup set, clearing authoritative store");
            self.delete_everything()?;
        }
        self.hydrate_all()
    }

    fn hydrate_all(&self) -> StorageResult<()> {
        for store in &self.hydration_order {
            store.hydrate().inspect_err(|e| {
                error!(store = store.store_name(), error = %e, "hydration failed");
            })?;
        }
        info!(stores = self.hydration_order.len(), "hydration complete");
        Ok(())
    }

    fn invalidate_all(&self) {
        for cache in &self.caches {
            cache.invalidate();
        }
    }

    /// Full administrative reset: reinitialize the authoritative schema,
    /// invalidate every registered cache, and re-hydrate.
    pub fn reset(&self) -> StorageResult<()> {
        info!("administrative reset");
        self.engine.reinitialize()?;
        self.invalidate_all();
        self.hydrate_all()
    }

    /// Removes all authoritative data in one transaction, then invalidates
    /// every registered cache.
    pub fn delete_everything(&self) -> StorageResult<()> {
        info!("deleting all authoritative data");
        self.engine
            .with_transaction(|ctx| self.engine.wipe_in(ctx.connection()))?;
        self.invalidate_all();
        Ok(())
    }

    /// Behaves as [`reset`](Self::reset) the first time it is invoked in
    /// this process and as [`delete_everything`](Self::delete_everything)
    /// afterwards, making repeated test/reset cycles cheaper once the
    /// schema is known good.
    pub fn clean_or_delete(&self) -> StorageResult<()> {
        let mut state = self.reset_state.lock().unwrap();
        match *state {
            ResetState::NotYetReset => {
                self.reset()?;
                *state = ResetState::Ready;
                Ok(())
            }
            ResetState::Ready => self.delete_everything(),
        }
    }

    /// Lets the authoritative engine perform deferred consistency work
    /// after a bulk data import.
    pub fn run_post_import_cleanup(&self) -> StorageResult<()> {
        self.engine.post_import_cleanup()
    }

    /// Releases authoritative-engine resources. The replication consumer
    /// must be stopped before this is called.
    pub fn shutdown(&self) -> StorageResult<()> {
        self.engine.shutdown()
    }
}
