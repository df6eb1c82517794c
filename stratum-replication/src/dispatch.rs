//! Typed dispatch of replicated events onto local stores.
//!
//! The registry maps store names to appliers and is assembled once during
//! process wiring, in the same dependency order as the stores themselves.
//! There is no runtime reflection: an event whose store is unregistered or
//! whose argument shape does not match its operation is a version-skew
//! bug, reported as a dispatch error and never applied.

use crate::error::{ReplicationError, ReplicationResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use stratum_store::CompositeStore;
use stratum_types::{ArgValue, EntityRecord, MutationEvent, OpKind};
use tracing::debug;

/// Applies one replicated mutation event to a local store.
pub trait EventApplier: Send + Sync {
    /// The store name this applier answers for.
    fn store_name(&self) -> &str;

    /// Applies the event. The event's `store` field already matched
    /// [`store_name`](Self::store_name).
    fn apply(&self, event: &MutationEvent) -> ReplicationResult<()>;
}

/// Refreshes a composite store's cache from replicated events.
///
/// Replication touches caches only: the authoritative relational store is
/// shared cluster-wide and was already written by the originating
/// transaction. Cache refreshes are idempotent, which is what makes
/// at-least-once batch application safe.
pub struct CacheApplier<T> {
    store: Arc<CompositeStore<T>>,
}

impl<T> CacheApplier<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(store: Arc<CompositeStore<T>>) -> Self {
        Self { store }
    }

    fn record_arg<'e>(&self, event: &'e MutationEvent, index: usize) -> ReplicationResult<&'e EntityRecord> {
        match event.args.get(index) {
            Some(ArgValue::Record(record)) => Ok(record),
            Some(other) => Err(self.dispatch_error(
                event,
                format!("argument {index}: expected record, got {}", other.type_name()),
            )),
            None => Err(self.dispatch_error(
                event,
                format!("argument {index} missing, got {} arguments", event.args.len()),
            )),
        }
    }

    fn text_arg<'e>(&self, event: &'e MutationEvent, index: usize) -> ReplicationResult<&'e str> {
        match event.args.get(index) {
            Some(ArgValue::Text(s)) => Ok(s),
            Some(other) => Err(self.dispatch_error(
                event,
                format!("argument {index}: expected text, got {}", other.type_name()),
            )),
            None => Err(self.dispatch_error(
                event,
                format!("argument {index} missing, got {} arguments", event.args.len()),
            )),
        }
    }

    fn dispatch_error(&self, event: &MutationEvent, detail: String) -> ReplicationError {
        ReplicationError::Dispatch {
            store: event.store.clone(),
            op: event.op.name().to_string(),
            detail,
        }
    }
}

impl<T> EventApplier for CacheApplier<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn store_name(&self) -> &str {
        self.store.name()
    }

    fn apply(&self, event: &MutationEvent) -> ReplicationResult<()> {
        match event.op {
            OpKind::Create | OpKind::Update => {
                let record = self.record_arg(event, 1)?;
                let value: T = record.decode().map_err(|e| {
                    self.dispatch_error(
                        event,
                        format!("undecodable payload for '{}': {e}", record.key),
                    )
                })?;
                self.store.refresh_put(&record.key, value);
            }
            OpKind::Delete => {
                let key = self.text_arg(event, 1)?;
                self.store.refresh_remove(key);
            }
            OpKind::Rename => {
                let from = self.text_arg(event, 1)?;
                let to = self.text_arg(event, 2)?;
                self.store.refresh_rename(from, to);
            }
        }
        debug!(store = %event.store, op = %event.op, "refreshed cache from event");
        Ok(())
    }
}

/// Store name → applier table, built once at startup.
#[derive(Default)]
pub struct DispatchRegistry {
    appliers: HashMap<String, Arc<dyn EventApplier>>,
}

impl DispatchRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an applier under its store name. Wiring-time only; the
    /// registry is immutable once handed to the pipeline.
    pub fn register(&mut self, applier: Arc<dyn EventApplier>) {
        self.appliers
            .insert(applier.store_name().to_string(), applier);
    }

    /// Resolves the event's store and applies it.
    pub fn dispatch(&self, event: &MutationEvent) -> ReplicationResult<()> {
        let applier = self
            .appliers
            .get(&event.store)
            .ok_or_else(|| ReplicationError::UnknownStore(event.store.clone()))?;
        applier.apply(event)
    }

    /// True if an applier is registered for `store`.
    pub fn contains(&self, store: &str) -> bool {
        self.appliers.contains_key(store)
    }

    /// Number of registered appliers.
    pub fn len(&self) -> usize {
        self.appliers.len()
    }

    /// True if no appliers are registered.
    pub fn is_empty(&self) -> bool {
        self.appliers.is_empty()
    }
}
