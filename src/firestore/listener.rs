//! Snapshot listener handles
//!
//! A native client reports snapshot updates through a [`SnapshotCallback`]
//! and hands back a [`ListenerRegistration`] that stops them.

use super::snapshot::Snapshot;
use crate::error::FirestoreError;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every snapshot update or with a terminal error
pub type SnapshotCallback = Arc<dyn Fn(Result<Snapshot, FirestoreError>) + Send + Sync>;

/// Handle for removing a snapshot listener
pub struct ListenerRegistration {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerRegistration {
    /// Registration that runs `remove` when the listener is removed
    pub fn new<F>(remove: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Registration with nothing to clean up
    pub fn noop() -> Self {
        Self { remove: None }
    }

    /// Removes the listener and stops receiving updates
    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
