//! Authoritative SQLite engine and the per-transaction context.
//!
//! All mutating calls run inside [`SqlEngine::with_transaction`]: the
//! closure receives a [`TxContext`] that owns the transaction's event batch
//! and its deferred cache updates. On commit the cache updates run and the
//! batch is published through the configured [`BatchSink`]; on rollback
//! both are discarded and nothing is observable outside the transaction.

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use stratum_types::{BatchSink, EventBatch, MutationEvent};
use tracing::{debug, info, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entities (
        id INTEGER PRIMARY KEY,
        store TEXT NOT NULL,
        key TEXT NOT NULL,
        payload TEXT NOT NULL,
        UNIQUE (store, key)
    );
    CREATE INDEX IF NOT EXISTS idx_entities_store ON entities (store);
";

/// The authoritative relational engine, shared by every store.
///
/// The connection is a single logical resource behind a mutex; SQLite
/// provides transaction isolation underneath it.
pub struct SqlEngine {
    conn: Arc<Mutex<Connection>>,
    sink: Arc<dyn BatchSink>,
    value_size_limit: usize,
}

impl std::fmt::Debug for SqlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlEngine")
            .field("value_size_limit", &self.value_size_limit)
            .finish_non_exhaustive()
    }
}

impl SqlEngine {
    /// Opens the backend selected by `config.engine` and creates the
    /// schema. An unknown engine name or a missing `db_path` is a fatal
    /// configuration error; the process must not start on it.
    pub fn open(config: &StorageConfig, sink: Arc<dyn BatchSink>) -> StorageResult<Self> {
        let conn = match config.engine.as_str() {
            "sqlite" => {
                let path = config.db_path.as_ref().ok_or_else(|| {
                    StorageError::Config("engine 'sqlite' requires db_path".to_string())
                })?;
                let conn = Connection::open(path)?;
                conn.pragma_update(None, "journal_mode", "WAL")?;
                info!(path = %path.display(), "opened sqlite storage engine");
                conn
            }
            "memory" => {
                info!("opened in-memory storage engine");
                Connection::open_in_memory()?
            }
            other => {
                return Err(StorageError::Config(format!(
                    "unknown storage engine '{other}'"
                )));
            }
        };
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sink,
            value_size_limit: config.value_size_limit,
        })
    }

    /// Handle to the shared connection, for store construction.
    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Maximum serialized size of a single stored value.
    pub fn value_size_limit(&self) -> usize {
        self.value_size_limit
    }

    /// Runs `f` inside a transaction.
    ///
    /// On `Ok` the transaction commits, the context's deferred cache
    /// updates run, and the recorded event batch (if non-empty) is
    /// published to the sink. On `Err` the transaction rolls back and the
    /// batch is discarded unpublished.
    pub fn with_transaction<R>(
        &self,
        f: impl FnOnce(&mut TxContext<'_>) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let mut guard = self.conn.lock().unwrap();
        let tx = guard.transaction()?;
        let mut ctx = TxContext::new(&tx);
        match f(&mut ctx) {
            Ok(value) => {
                let (batch, deferred) = ctx.into_parts();
                tx.commit()?;
                drop(guard);
                for action in deferred {
                    action();
                }
                if !batch.is_empty() {
                    debug!(events = batch.len(), "publishing committed event batch");
                    self.sink.publish(batch);
                }
                Ok(value)
            }
            Err(err) => {
                drop(ctx);
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Runs `f` with shared read access to the connection.
    pub fn read<R>(&self, f: impl FnOnce(&Connection) -> StorageResult<R>) -> StorageResult<R> {
        let guard = self.conn.lock().unwrap();
        f(&guard)
    }

    /// Removes every authoritative row. Runs within the caller's
    /// transaction; generates no mutation events.
    pub fn wipe_in(&self, conn: &Connection) -> StorageResult<()> {
        let removed = conn.execute("DELETE FROM entities", [])?;
        info!(removed, "wiped authoritative store");
        Ok(())
    }

    /// Drops and recreates the schema. Used by the administrative reset.
    pub fn reinitialize(&self) -> StorageResult<()> {
        let guard = self.conn.lock().unwrap();
        guard.execute_batch("DROP TABLE IF EXISTS entities; DROP INDEX IF EXISTS idx_entities_store;")?;
        guard.execute_batch(SCHEMA)?;
        info!("reinitialized authoritative schema");
        Ok(())
    }

    /// Deferred consistency work after a bulk import: refresh the query
    /// planner statistics and fold the WAL into the main file.
    pub fn post_import_cleanup(&self) -> StorageResult<()> {
        let guard = self.conn.lock().unwrap();
        guard.execute_batch("ANALYZE;")?;
        guard.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_row| Ok(()))?;
        info!("post-import cleanup complete");
        Ok(())
    }

    /// Releases engine resources. The replication consumer must already be
    /// stopped; the connection itself closes when the last handle drops.
    pub fn shutdown(&self) -> StorageResult<()> {
        let guard = self.conn.lock().unwrap();
        let _ = guard.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_row| Ok(()));
        info!("storage engine shut down");
        Ok(())
    }
}

/// The explicit per-transaction context threaded through mutating calls.
///
/// Owns the transaction's event batch and the cache updates deferred to
/// commit time. There is no ambient "current transaction" state anywhere
/// in the crate.
pub struct TxContext<'a> {
    conn: &'a Connection,
    batch: EventBatch,
    deferred: Vec<Box<dyn FnOnce()>>,
}

impl<'a> TxContext<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            batch: EventBatch::new(),
            deferred: Vec::new(),
        }
    }

    /// The transaction's connection.
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    /// Records a mutation event in the transaction's batch.
    pub fn record(&mut self, event: MutationEvent) {
        self.batch.push(event);
    }

    /// Defers an action to run only if the transaction commits.
    pub fn after_commit(&mut self, action: impl FnOnce() + 'static) {
        self.deferred.push(Box::new(action));
    }

    /// Number of events recorded so far.
    pub fn events_recorded(&self) -> usize {
        self.batch.len()
    }

    fn into_parts(self) -> (EventBatch, Vec<Box<dyn FnOnce()>>) {
        (self.batch, self.deferred)
    }
}
