use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stratum_store::{EntityStore, SqlEngine, SqlTableStore, StorageConfig, StorageError};
use stratum_types::DiscardSink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    quota: u32,
}

fn user(name: &str) -> User {
    User {
        name: name.to_string(),
        quota: 10,
    }
}

fn memory_engine() -> Arc<SqlEngine> {
    Arc::new(SqlEngine::open(&StorageConfig::memory(), Arc::new(DiscardSink)).unwrap())
}

#[test]
fn create_and_get() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    store.create("u1", &user("alice")).unwrap();
    assert_eq!(store.get("u1").unwrap(), user("alice"));
    assert!(store.exists("u1").unwrap());
}

#[test]
fn create_existing_key_is_conflict() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    store.create("u1", &user("alice")).unwrap();
    let err = store.create("u1", &user("bob")).unwrap_err();
    assert!(matches!(err, StorageError::Conflict(ref key) if key == "u1"));
    // the original value is untouched
    assert_eq!(store.get("u1").unwrap(), user("alice"));
}

#[test]
fn get_missing_key_is_not_found() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    let err = store.get("nope").unwrap_err();
    assert!(matches!(err, StorageError::NotFound(ref key) if key == "nope"));
}

#[test]
fn update_replaces_value() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    store.create("u1", &user("alice")).unwrap();
    store.update("u1", &user("alice-renamed")).unwrap();
    assert_eq!(store.get("u1").unwrap(), user("alice-renamed"));
}

#[test]
fn update_missing_key_is_not_found() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    let err = store.update("nope", &user("x")).unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[test]
fn delete_removes() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    store.create("u1", &user("alice")).unwrap();
    store.delete("u1").unwrap();
    assert!(!store.exists("u1").unwrap());
    assert!(matches!(store.get("u1"), Err(StorageError::NotFound(_))));
}

#[test]
fn delete_missing_key_is_not_found() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    let err = store.delete("nope").unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[test]
fn get_all_returns_every_entity() {
    let engine = memory_engine();
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");

    assert!(store.get_all().unwrap().is_empty());
    store.create("u1", &user("alice")).unwrap();
    store.create("u2", &user("bob")).unwrap();

    let all = store.get_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["u1"], user("alice"));
    assert_eq!(all["u2"], user("bob"));
}

#[test]
fn stores_are_isolated_by_name() {
    let engine = memory_engine();
    let users: SqlTableStore<User> = SqlTableStore::new(&engine, "users");
    let admins: SqlTableStore<User> = SqlTableStore::new(&engine, "admins");

    users.create("u1", &user("alice")).unwrap();
    assert!(!admins.exists("u1").unwrap());
    assert_eq!(admins.get_all().unwrap().len(), 0);

    // same key in a different store is not a conflict
    admins.create("u1", &user("root")).unwrap();
    assert_eq!(users.get("u1").unwrap(), user("alice"));
    assert_eq!(admins.get("u1").unwrap(), user("root"));
}

#[test]
fn file_backed_engine_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        engine: "sqlite".to_string(),
        db_path: Some(dir.path().join("stratum.db")),
        ..StorageConfig::default()
    };

    {
        let engine = Arc::new(SqlEngine::open(&config, Arc::new(DiscardSink)).unwrap());
        let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");
        store.create("u1", &user("alice")).unwrap();
        engine.shutdown().unwrap();
    }

    let engine = Arc::new(SqlEngine::open(&config, Arc::new(DiscardSink)).unwrap());
    let store: SqlTableStore<User> = SqlTableStore::new(&engine, "users");
    assert_eq!(store.get("u1").unwrap(), user("alice"));
}
