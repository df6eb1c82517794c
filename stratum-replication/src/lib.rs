//! Cross-node replication for Stratum.
//!
//! Mutations committed on one node reach every other node's cache through
//! an asynchronous event pipeline:
//! - [`codec`] — the binary wire form of event batches
//! - [`DispatchRegistry`] / [`CacheApplier`] — typed, reflection-free
//!   resolution of events onto local stores
//! - [`ReplicationPipeline`] — the global queue and its single background
//!   consumer; [`BatchPublisher`] is both the engine's commit-time
//!   [`stratum_types::BatchSink`] and the ingress for remote batches
//!
//! Wiring order: create the pipeline, open the engine with its publisher,
//! build the stores, assemble the registry, start the pipeline.

pub mod codec;

mod dispatch;
mod error;
mod pipeline;

pub use dispatch::{CacheApplier, DispatchRegistry, EventApplier};
pub use error::{CodecError, ReplicationError, ReplicationResult};
pub use pipeline::{BatchPublisher, PipelineHandle, ReplicationPipeline};
