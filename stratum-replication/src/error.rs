//! Error types for the replication layer.

use stratum_store::StorageError;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors raised while decoding or applying replicated batches.
///
/// Everything that can go wrong while applying a remote event funnels into
/// this one type; the consumer logs it and moves on to the next batch.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// The event names a store no applier is registered for.
    /// Version skew or a wiring bug, never expected in normal operation.
    #[error("no applier registered for store '{0}'")]
    UnknownStore(String),

    /// The event's argument shape does not match its operation.
    #[error("store '{store}' cannot apply '{op}': {detail}")]
    Dispatch {
        store: String,
        op: String,
        detail: String,
    },

    /// The batch could not be decoded from its wire form.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The underlying store rejected the refresh.
    #[error("failed to apply event to store '{store}': {source}")]
    Apply {
        store: String,
        source: StorageError,
    },

    /// The pipeline has been shut down.
    #[error("replication queue closed")]
    QueueClosed,
}

/// Errors raised by the wire codec. Fatal to the batch being decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Unknown argument type tag. Never silently ignored.
    #[error("unknown data type tag 0x{0:02x}")]
    UnknownTag(u8),

    /// Unknown operation name.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Input ended in the middle of a field.
    #[error("truncated input while reading {0}")]
    Truncated(&'static str),

    /// Bytes left over after the declared event count.
    #[error("{0} trailing bytes after batch")]
    TrailingData(usize),

    /// A string field is not valid UTF-8.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// A length prefix exceeds the wire size cap.
    #[error("field of {0} bytes exceeds the wire size cap")]
    TooLarge(usize),
}
