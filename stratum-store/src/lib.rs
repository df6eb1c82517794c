//! Storage core for Stratum.
//!
//! Keeps an authoritative SQLite store and a derived in-memory cache
//! synchronized behind one generic CRUD surface.
//!
//! # Architecture
//!
//! - [`EntityStore`] — the contract every store implements
//! - [`SqlTableStore`] — authoritative backend, JSON payloads in SQLite
//! - [`MemoryCacheStore`] — the derived read cache
//! - [`CompositeStore`] — authoritative-first writes, cache-only reads,
//!   mutation events recorded per transaction
//! - [`SqlEngine`] / [`TxContext`] — explicit transactions; committed
//!   batches leave through a [`stratum_types::BatchSink`]
//! - Integrity handlers veto removals/updates of referenced entities
//!   before they are persisted
//! - [`LifecycleManager`] — startup hydration in dependency order, plus
//!   administrative reset/wipe/cleanup

mod cache;
mod composite;
mod config;
mod contract;
mod engine;
mod error;
mod integrity;
mod lifecycle;
mod sql_store;

pub use cache::{CacheInvalidate, MemoryCacheStore};
pub use composite::CompositeStore;
pub use config::{ALT_CONFIG_ENV, StorageConfig};
pub use contract::EntityStore;
pub use engine::{SqlEngine, TxContext};
pub use error::{StorageError, StorageResult};
pub use integrity::{PlannedUpdate, RemovalHandler, UpdateFlags, UpdateHandler};
pub use lifecycle::{Hydratable, LifecycleManager};
pub use sql_store::SqlTableStore;
