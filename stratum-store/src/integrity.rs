//! Reference integrity tracking.
//!
//! Stores whose entities may be referenced elsewhere accept handler
//! registrations at wiring time. Before a tracked entity is removed or
//! updated, every registered handler is consulted in registration order;
//! the first rejection aborts the operation and its transaction. Handlers
//! only validate — they must not themselves mutate storage, which would
//! re-enter the integrity checks.

/// Which kind of update is about to be persisted, so a handler can apply
/// kind-specific checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateFlags {
    /// The entity's value changes.
    pub content_changed: bool,
    /// The entity's key changes, value preserved.
    pub renamed: bool,
}

impl UpdateFlags {
    /// Flags for a plain content update.
    pub fn content() -> Self {
        Self {
            content_changed: true,
            renamed: false,
        }
    }

    /// Flags for an identity-preserving rename.
    pub fn rename() -> Self {
        Self {
            content_changed: false,
            renamed: true,
        }
    }
}

/// The update about to be committed, as seen by update handlers.
///
/// `old_value` is the state currently persisted; `new_value` is the state
/// after the mutation. For a rename the two are equal and `modified_name`
/// carries the new key.
#[derive(Debug, Clone)]
pub struct PlannedUpdate<T> {
    /// Authoritative row id of the modified entity.
    pub modified_id: i64,
    /// The entity's key after the mutation, when known.
    pub modified_name: Option<String>,
    /// State before the mutation.
    pub old_value: T,
    /// State after the mutation.
    pub new_value: T,
    /// Update kind discriminators.
    pub flags: UpdateFlags,
}

/// Consulted before a tracked entity is removed.
/// Return `Err(reason)` to veto the removal.
pub trait RemovalHandler: Send + Sync {
    fn pre_remove_check(&self, id: i64, name: &str) -> Result<(), String>;
}

/// Consulted before an update to a tracked entity is persisted.
/// Return `Err(reason)` to veto the update.
pub trait UpdateHandler<T>: Send + Sync {
    fn pre_update_check(&self, update: &PlannedUpdate<T>) -> Result<(), String>;
}
