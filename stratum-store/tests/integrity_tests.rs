//! Reference integrity handlers: veto semantics and event fidelity.

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use stratum_store::{
    CompositeStore, EntityStore, PlannedUpdate, RemovalHandler, SqlEngine, StorageConfig,
    StorageError, UpdateHandler,
};
use stratum_types::DiscardSink;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Group {
    description: String,
    members: u32,
}

fn group(description: &str) -> Group {
    Group {
        description: description.to_string(),
        members: 2,
    }
}

fn memory_engine() -> Arc<SqlEngine> {
    Arc::new(SqlEngine::open(&StorageConfig::memory(), Arc::new(DiscardSink)).unwrap())
}

/// Rejects removal of one protected group.
struct ProtectGroup(&'static str);

impl RemovalHandler for ProtectGroup {
    fn pre_remove_check(&self, _id: i64, name: &str) -> Result<(), String> {
        if name == self.0 {
            Err(format!("group '{name}' is referenced by access rules"))
        } else {
            Ok(())
        }
    }
}

/// Records every planned update it sees, accepting all of them.
#[derive(Default)]
struct CaptureUpdates {
    seen: Mutex<Vec<PlannedUpdate<Group>>>,
}

impl UpdateHandler<Group> for CaptureUpdates {
    fn pre_update_check(&self, update: &PlannedUpdate<Group>) -> Result<(), String> {
        self.seen.lock().unwrap().push(update.clone());
        Ok(())
    }
}

/// Rejects every update.
struct RejectUpdates;

impl UpdateHandler<Group> for RejectUpdates {
    fn pre_update_check(&self, _update: &PlannedUpdate<Group>) -> Result<(), String> {
        Err("frozen".to_string())
    }
}

/// Records its own invocation, then answers as configured.
struct OrderedHandler {
    tag: &'static str,
    verdict: Result<(), String>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RemovalHandler for OrderedHandler {
    fn pre_remove_check(&self, _id: i64, _name: &str) -> Result<(), String> {
        self.calls.lock().unwrap().push(self.tag);
        self.verdict.clone()
    }
}

#[test]
fn removal_handler_blocks_delete() {
    let engine = memory_engine();
    let mut groups = CompositeStore::new(engine.clone(), "groups");
    groups.add_removal_handler(Arc::new(ProtectGroup("admins")));
    let groups = Arc::new(groups);

    groups.create("admins", &group("administrators")).unwrap();
    groups.create("staff", &group("staff")).unwrap();

    let err = groups.delete("admins").unwrap_err();
    match err {
        StorageError::IntegrityViolation { name, reason } => {
            assert_eq!(name, "admins");
            assert!(reason.contains("referenced"));
        }
        other => panic!("expected IntegrityViolation, got {other:?}"),
    }

    // the entity remains present and unchanged, in both backends
    assert!(groups.exists("admins").unwrap());
    assert_eq!(groups.get("admins").unwrap(), group("administrators"));
    assert_eq!(
        groups.authoritative().get("admins").unwrap(),
        group("administrators")
    );

    // unprotected entities still delete normally
    groups.delete("staff").unwrap();
    assert!(!groups.exists("staff").unwrap());
}

#[test]
fn removal_handlers_run_in_registration_order_and_stop_at_first_veto() {
    let engine = memory_engine();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let mut groups = CompositeStore::new(engine.clone(), "groups");
    groups.add_removal_handler(Arc::new(OrderedHandler {
        tag: "first",
        verdict: Ok(()),
        calls: calls.clone(),
    }));
    groups.add_removal_handler(Arc::new(OrderedHandler {
        tag: "second",
        verdict: Err("no".to_string()),
        calls: calls.clone(),
    }));
    groups.add_removal_handler(Arc::new(OrderedHandler {
        tag: "third",
        verdict: Ok(()),
        calls: calls.clone(),
    }));
    let groups: Arc<CompositeStore<Group>> = Arc::new(groups);

    groups.create("g1", &group("g")).unwrap();
    assert!(matches!(
        groups.delete("g1"),
        Err(StorageError::IntegrityViolation { .. })
    ));
    assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn update_handler_sees_old_and_new_values() {
    let engine = memory_engine();
    let capture = Arc::new(CaptureUpdates::default());

    let mut groups = CompositeStore::new(engine.clone(), "groups");
    groups.add_update_handler(capture.clone());
    let groups = Arc::new(groups);

    groups.create("g1", &group("before")).unwrap();
    groups.update("g1", &group("after")).unwrap();

    let seen = capture.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let update = &seen[0];
    assert_eq!(update.old_value, group("before"));
    assert_eq!(update.new_value, group("after"));
    assert_eq!(update.modified_name.as_deref(), Some("g1"));
    assert!(update.modified_id > 0);
    assert!(update.flags.content_changed);
    assert!(!update.flags.renamed);
}

#[test]
fn rename_is_flagged_distinctly_from_content_change() {
    let engine = memory_engine();
    let capture = Arc::new(CaptureUpdates::default());

    let mut groups = CompositeStore::new(engine.clone(), "groups");
    groups.add_update_handler(capture.clone());
    let groups = Arc::new(groups);

    groups.create("old-name", &group("g")).unwrap();
    groups.rename("old-name", "new-name").unwrap();

    let seen = capture.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let update = &seen[0];
    assert!(update.flags.renamed);
    assert!(!update.flags.content_changed);
    // value preserved, name carries the new key
    assert_eq!(update.old_value, update.new_value);
    assert_eq!(update.modified_name.as_deref(), Some("new-name"));
}

#[test]
fn update_veto_aborts_the_transaction() {
    let engine = memory_engine();
    let mut groups = CompositeStore::new(engine.clone(), "groups");
    groups.add_update_handler(Arc::new(RejectUpdates));
    let groups = Arc::new(groups);

    groups.create("g1", &group("original")).unwrap();

    assert!(matches!(
        groups.update("g1", &group("changed")),
        Err(StorageError::IntegrityViolation { .. })
    ));
    assert_eq!(groups.get("g1").unwrap(), group("original"));
    assert_eq!(
        groups.authoritative().get("g1").unwrap(),
        group("original")
    );

    assert!(matches!(
        groups.rename("g1", "g2"),
        Err(StorageError::IntegrityViolation { .. })
    ));
    assert!(groups.exists("g1").unwrap());
    assert!(!groups.authoritative().exists("g2").unwrap());
}

#[test]
fn example_scenario_protected_group() {
    let engine = memory_engine();
    let mut groups = CompositeStore::new(engine.clone(), "groups");
    groups.add_removal_handler(Arc::new(ProtectGroup("admins")));
    let groups = Arc::new(groups);

    groups.create("admins", &group("administrators")).unwrap();
    assert!(matches!(
        groups.delete("admins"),
        Err(StorageError::IntegrityViolation { .. })
    ));
    assert!(groups.exists("admins").unwrap());
}
