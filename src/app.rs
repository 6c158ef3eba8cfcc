//! Firebase handle
//!
//! The [`FirebaseHandle`] is what redux-firestore extends: it optionally
//! carries a native Firestore client and owns the internal-state slot where
//! configuration and the listener registry live. Sibling integrations share
//! a handle by cloning it.

use crate::config::Config;
use crate::firestore::NativeFirestore;
use crate::internals::Internals;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Name of the default handle
pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// Shared handle to a Firebase app and its Firestore client
#[derive(Clone)]
pub struct FirebaseHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    name: String,
    firestore: Option<Arc<dyn NativeFirestore>>,
    internals: RwLock<Internals>,
}

/// Non-owning reference to a [`FirebaseHandle`]
#[derive(Clone)]
pub struct WeakFirebaseHandle {
    inner: Weak<HandleInner>,
}

impl FirebaseHandle {
    /// Create a handle
    ///
    /// # Example
    /// ```
    /// use redux_firestore::{FirebaseHandle, MemoryFirestore};
    ///
    /// let firebase = FirebaseHandle::new("app", Some(MemoryFirestore::new()));
    /// assert!(firebase.firestore().is_some());
    /// ```
    pub fn new<F>(name: impl Into<String>, firestore: Option<F>) -> Self
    where
        F: NativeFirestore,
    {
        Self::from_parts(
            name.into(),
            firestore.map(|native| Arc::new(native) as Arc<dyn NativeFirestore>),
        )
    }

    /// Create a default-named handle around a client
    pub fn with_firestore<F: NativeFirestore>(firestore: F) -> Self {
        Self::new(DEFAULT_APP_NAME, Some(firestore))
    }

    /// Create a handle with no Firestore accessor
    pub fn without_firestore(name: impl Into<String>) -> Self {
        Self::from_parts(name.into(), None)
    }

    /// Create a handle around an already shared client
    pub fn from_parts(name: String, firestore: Option<Arc<dyn NativeFirestore>>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name,
                firestore,
                internals: RwLock::new(Internals::default()),
            }),
        }
    }

    /// Handle name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The native Firestore client, if the handle has one
    pub fn firestore(&self) -> Option<Arc<dyn NativeFirestore>> {
        self.inner.firestore.clone()
    }

    /// Merge `internals` into the handle's internal state
    pub fn extend_app(&self, internals: Internals) {
        let mut slot = self.internals_mut();
        let existing = std::mem::take(&mut *slot);
        *slot = internals.merge(existing);
    }

    /// Read access to the internal state
    pub fn internals(&self) -> RwLockReadGuard<'_, Internals> {
        self.inner
            .internals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the internal state
    pub fn internals_mut(&self) -> RwLockWriteGuard<'_, Internals> {
        self.inner
            .internals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the configuration stored in the internal state
    pub fn config(&self) -> Config {
        self.internals().config.clone()
    }

    /// Non-owning reference, for callbacks that must not keep the handle alive
    pub fn downgrade(&self) -> WeakFirebaseHandle {
        WeakFirebaseHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same app
    pub fn ptr_eq(&self, other: &FirebaseHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl WeakFirebaseHandle {
    /// Upgrade to a handle if it is still alive
    pub fn upgrade(&self) -> Option<FirebaseHandle> {
        self.inner.upgrade().map(|inner| FirebaseHandle { inner })
    }
}

impl std::fmt::Debug for FirebaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseHandle")
            .field("name", &self.inner.name)
            .field("has_firestore", &self.inner.firestore.is_some())
            .finish()
    }
}
