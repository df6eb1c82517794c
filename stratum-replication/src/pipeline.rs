//! The replication pipeline: a global FIFO queue of committed batches and
//! the single background consumer that applies them to local stores.
//!
//! Committing transactions publish batches through [`BatchPublisher`]
//! without blocking; batches arriving from remote nodes enter the same
//! queue via [`BatchPublisher::ingest_encoded`]. The consumer task applies
//! batches in dequeue order and events within a batch in recorded order.
//! A failing event is logged and aborts the rest of its batch only — the
//! consumer keeps draining the queue. Application is at-least-once; cache
//! refreshes are idempotent, so replays are harmless.

use crate::codec::decode_batch;
use crate::dispatch::DispatchRegistry;
use crate::error::ReplicationResult;
use std::sync::Arc;
use stratum_types::{BatchSink, EventBatch};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

enum QueueItem {
    Batch(EventBatch),
    Shutdown,
}

/// Thread-safe, non-blocking entry point into the replication queue.
pub struct BatchPublisher {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl BatchPublisher {
    fn send(&self, batch: EventBatch) {
        if self.tx.send(QueueItem::Batch(batch)).is_err() {
            warn!("replication queue closed, dropping batch");
        }
    }

    /// Decodes a batch received from a remote node and enqueues it.
    /// A codec error is fatal to that batch only.
    pub fn ingest_encoded(&self, bytes: &[u8]) -> ReplicationResult<()> {
        let batch = decode_batch(bytes)?;
        debug!(events = batch.len(), "ingested remote batch");
        self.send(batch);
        Ok(())
    }
}

impl BatchSink for BatchPublisher {
    fn publish(&self, batch: EventBatch) {
        self.send(batch);
    }
}

/// The queue plus its not-yet-started consumer.
///
/// Created before the storage engine so the engine can publish into it;
/// started after the dispatch registry is assembled. Must be started from
/// within a tokio runtime.
pub struct ReplicationPipeline {
    tx: mpsc::UnboundedSender<QueueItem>,
    rx: mpsc::UnboundedReceiver<QueueItem>,
}

impl ReplicationPipeline {
    /// Creates the queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A publisher handle onto the queue. Cheap to call repeatedly.
    pub fn publisher(&self) -> Arc<BatchPublisher> {
        Arc::new(BatchPublisher {
            tx: self.tx.clone(),
        })
    }

    /// Spawns the background consumer over the assembled registry.
    pub fn start(self, registry: Arc<DispatchRegistry>) -> PipelineHandle {
        let Self { tx, rx } = self;
        let worker = tokio::spawn(consume(rx, registry));
        PipelineHandle { tx, worker }
    }
}

impl Default for ReplicationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

async fn consume(mut rx: mpsc::UnboundedReceiver<QueueItem>, registry: Arc<DispatchRegistry>) {
    info!(stores = registry.len(), "replication consumer started");
    while let Some(item) = rx.recv().await {
        match item {
            QueueItem::Shutdown => break,
            QueueItem::Batch(batch) => apply_batch(&registry, &batch),
        }
    }
    info!("replication consumer stopped");
}

fn apply_batch(registry: &DispatchRegistry, batch: &EventBatch) {
    for (index, event) in batch.iter().enumerate() {
        if let Err(e) = registry.dispatch(event) {
            error!(
                store = %event.store,
                op = %event.op,
                index,
                error = %e,
                "failed to apply replicated event, abandoning rest of batch"
            );
            return;
        }
    }
    debug!(events = batch.len(), "applied replicated batch");
}

/// Handle to the running consumer.
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<QueueItem>,
    worker: JoinHandle<()>,
}

impl PipelineHandle {
    /// Stops the consumer cleanly. The queue is FIFO, so every batch
    /// published before this call is applied before the consumer exits;
    /// anything published afterwards is dropped with a warning.
    pub async fn shutdown(self) {
        let _ = self.tx.send(QueueItem::Shutdown);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "replication consumer task failed");
        }
    }
}
