//! Authoritative backend for one named entity store.
//!
//! Entities are rows in the shared `entities` table, stored as JSON
//! payloads keyed by `(store, key)`. The store name is the stable
//! identifier used for event dispatch across the cluster.

use crate::contract::EntityStore;
use crate::engine::SqlEngine;
use crate::error::{StorageError, StorageResult};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// SQLite-backed store for entities of type `T`.
///
/// The `*_in` methods run against a caller-supplied connection so they can
/// participate in an enclosing transaction; the [`EntityStore`] impl locks
/// the shared connection per call and runs in autocommit mode. This is the
/// raw backend: it applies no size limits, integrity checks, or event
/// recording — that is the composite store's job.
pub struct SqlTableStore<T> {
    conn: Arc<Mutex<Connection>>,
    store: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SqlTableStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a handle onto the engine's shared connection.
    pub fn new(engine: &SqlEngine, store: impl Into<String>) -> Self {
        Self {
            conn: engine.connection(),
            store: store.into(),
            _marker: PhantomData,
        }
    }

    /// The store's stable name.
    pub fn name(&self) -> &str {
        &self.store
    }

    /// Row id of `key`, if present.
    pub fn id_of(&self, conn: &Connection, key: &str) -> StorageResult<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM entities WHERE store = ?1 AND key = ?2",
                params![self.store, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Row id and current value of `key`. Fails `NotFound` if absent.
    pub fn row_of(&self, conn: &Connection, key: &str) -> StorageResult<(i64, T)> {
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, payload FROM entities WHERE store = ?1 AND key = ?2",
                params![self.store, key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((id, payload)) => Ok((id, serde_json::from_str(&payload)?)),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    /// Inserts a pre-serialized payload. Returns the new row id.
    pub fn create_raw_in(
        &self,
        conn: &Connection,
        key: &str,
        payload: &str,
    ) -> StorageResult<i64> {
        if self.id_of(conn, key)?.is_some() {
            return Err(StorageError::Conflict(key.to_string()));
        }
        conn.execute(
            "INSERT INTO entities (store, key, payload) VALUES (?1, ?2, ?3)",
            params![self.store, key, payload],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Replaces the payload of an existing row.
    pub fn set_payload_in(&self, conn: &Connection, row_id: i64, payload: &str) -> StorageResult<()> {
        conn.execute(
            "UPDATE entities SET payload = ?2 WHERE id = ?1",
            params![row_id, payload],
        )?;
        Ok(())
    }

    /// Changes the key of an existing row.
    pub fn set_key_in(&self, conn: &Connection, row_id: i64, key: &str) -> StorageResult<()> {
        conn.execute(
            "UPDATE entities SET key = ?2 WHERE id = ?1",
            params![row_id, key],
        )?;
        Ok(())
    }

    /// Removes a row by id.
    pub fn delete_row_in(&self, conn: &Connection, row_id: i64) -> StorageResult<()> {
        conn.execute("DELETE FROM entities WHERE id = ?1", params![row_id])?;
        Ok(())
    }

    /// Returns the value stored under `key`. Fails `NotFound` if absent.
    pub fn get_in(&self, conn: &Connection, key: &str) -> StorageResult<T> {
        Ok(self.row_of(conn, key)?.1)
    }

    /// True if `key` is present.
    pub fn exists_in(&self, conn: &Connection, key: &str) -> StorageResult<bool> {
        Ok(self.id_of(conn, key)?.is_some())
    }

    /// All entities of this store, keyed.
    pub fn get_all_in(&self, conn: &Connection) -> StorageResult<HashMap<String, T>> {
        let mut stmt =
            conn.prepare("SELECT key, payload FROM entities WHERE store = ?1")?;
        let rows = stmt.query_map(params![self.store], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut all = HashMap::new();
        for row in rows {
            let (key, payload) = row?;
            all.insert(key, serde_json::from_str(&payload)?);
        }
        Ok(all)
    }
}

impl<T> EntityStore<T> for SqlTableStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn create(&self, key: &str, value: &T) -> StorageResult<()> {
        let payload = serde_json::to_string(value)?;
        let guard = self.conn.lock().unwrap();
        self.create_raw_in(&guard, key, &payload)?;
        Ok(())
    }

    fn update(&self, key: &str, value: &T) -> StorageResult<()> {
        let payload = serde_json::to_string(value)?;
        let guard = self.conn.lock().unwrap();
        let row_id = self
            .id_of(&guard, key)?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        self.set_payload_in(&guard, row_id, &payload)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let guard = self.conn.lock().unwrap();
        let row_id = self
            .id_of(&guard, key)?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        self.delete_row_in(&guard, row_id)
    }

    fn get(&self, key: &str) -> StorageResult<T> {
        let guard = self.conn.lock().unwrap();
        self.get_in(&guard, key)
    }

    fn get_all(&self) -> StorageResult<HashMap<String, T>> {
        let guard = self.conn.lock().unwrap();
        self.get_all_in(&guard)
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        let guard = self.conn.lock().unwrap();
        self.exists_in(&guard, key)
    }
}
