//! Core type definitions for Stratum.
//!
//! This crate defines the fundamental, store-agnostic types shared by the
//! storage and replication layers:
//! - [`ArgValue`] — the closed set of serializable argument values an event
//!   may carry (text, integer, entity record)
//! - [`EntityRecord`] — the serialized entity envelope (key + JSON payload)
//! - [`MutationEvent`] / [`EventBatch`] — the replayable description of
//!   state-changing operations, grouped per transaction
//! - [`BatchSink`] — the seam through which committed batches leave the
//!   storage layer and enter the replication pipeline
//!
//! Domain-specific entity types belong to the callers of the storage layer,
//! not here — events carry entities only in serialized form.

mod event;
mod value;

pub use event::{BatchSink, DiscardSink, EventBatch, MutationEvent, OpKind};
pub use value::{ArgValue, EntityRecord};
