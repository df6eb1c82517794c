//! Mutation events and per-transaction event batches.
//!
//! A [`MutationEvent`] records one state-changing call against a named store
//! so it can be replayed on another node's cache. Events are grouped into an
//! [`EventBatch`] per transaction; a batch is only ever handed to the
//! replication layer after the owning transaction has committed.

use crate::value::{ArgValue, EntityRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of operations a store exposes for replication.
///
/// Dispatch is by this enum plus the store name — there is no runtime
/// reflection and no fallback argument class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Create,
    Update,
    Delete,
    Rename,
}

impl OpKind {
    /// Stable operation name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Rename => "rename",
        }
    }

    /// Parses a wire operation name. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "rename" => Some(Self::Rename),
            _ => None,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recorded description of one mutating call: target store, operation,
/// and the operation's arguments in declaration order.
///
/// The constructors fix the argument shape per operation; the dispatch
/// layer treats any other shape as a version-skew bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    /// The target store's stable name (its cluster-wide identifier).
    pub store: String,
    /// The operation performed.
    pub op: OpKind,
    /// Ordered, typed arguments of the call.
    pub args: Vec<ArgValue>,
}

impl MutationEvent {
    /// Creates an event with an explicit argument list.
    pub fn new(store: impl Into<String>, op: OpKind, args: Vec<ArgValue>) -> Self {
        Self {
            store: store.into(),
            op,
            args,
        }
    }

    /// A `create` call: `[row id, entity record]`.
    pub fn create(store: impl Into<String>, row_id: i64, record: EntityRecord) -> Self {
        Self::new(
            store,
            OpKind::Create,
            vec![ArgValue::Long(row_id), ArgValue::Record(record)],
        )
    }

    /// An `update` call: `[row id, entity record]`.
    pub fn update(store: impl Into<String>, row_id: i64, record: EntityRecord) -> Self {
        Self::new(
            store,
            OpKind::Update,
            vec![ArgValue::Long(row_id), ArgValue::Record(record)],
        )
    }

    /// A `delete` call: `[row id, entity key]`.
    pub fn delete(store: impl Into<String>, row_id: i64, key: impl Into<String>) -> Self {
        Self::new(
            store,
            OpKind::Delete,
            vec![ArgValue::Long(row_id), ArgValue::Text(key.into())],
        )
    }

    /// A `rename` call: `[row id, old key, new key]`.
    pub fn rename(
        store: impl Into<String>,
        row_id: i64,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(
            store,
            OpKind::Rename,
            vec![
                ArgValue::Long(row_id),
                ArgValue::Text(from.into()),
                ArgValue::Text(to.into()),
            ],
        )
    }
}

/// The ordered sequence of mutation events produced by one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventBatch {
    events: Vec<MutationEvent>,
}

impl EventBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch from pre-recorded events, preserving order.
    pub fn from_events(events: Vec<MutationEvent>) -> Self {
        Self { events }
    }

    /// Appends an event, preserving recording order.
    pub fn push(&mut self, event: MutationEvent) {
        self.events.push(event);
    }

    /// Number of events in the batch.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no events were recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &MutationEvent> {
        self.events.iter()
    }

    /// The recorded events, in order.
    pub fn events(&self) -> &[MutationEvent] {
        &self.events
    }
}

impl IntoIterator for EventBatch {
    type Item = MutationEvent;
    type IntoIter = std::vec::IntoIter<MutationEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Receives batches of committed mutation events.
///
/// The storage engine publishes through this trait at commit time, which
/// keeps the storage layer free of any dependency on the replication
/// pipeline's queue.
pub trait BatchSink: Send + Sync {
    /// Hands over a committed batch. Must not block the committing thread
    /// beyond normal queue contention.
    fn publish(&self, batch: EventBatch);
}

/// A sink that drops every batch. For embedders running without replication.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl BatchSink for DiscardSink {
    fn publish(&self, _batch: EventBatch) {}
}
