//! Method binding
//!
//! [`bind_actions`] pre-applies the Firebase handle and dispatch function to
//! every action, producing the helper methods of the extended instance.
//! Aliases expose an existing binding under a second name.
//! [`bind_native_methods`] copies the allow-listed members of the native
//! client, keeping only those that exist and are callable.

use crate::action::Dispatch;
use crate::actions::{ActionDefinition, ActionSet};
use crate::app::FirebaseHandle;
use crate::constants::DEFAULT_ALIASES;
use crate::error::ReduxFirestoreError;
use crate::firestore::{NativeFirestore, NativeMember, NativeMethod};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Future returned by a bound method
pub type MethodFuture = BoxFuture<'static, Result<Value, ReduxFirestoreError>>;

/// Second name for an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// Name of the action being aliased
    pub action: String,
    /// Name the alias is exposed under
    pub name: String,
}

impl Alias {
    /// Expose `action` as `name`
    pub fn new(action: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            name: name.into(),
        }
    }

    /// `deleteRef` → `delete` and `setListener` → `onSnapshot`
    pub fn defaults() -> Vec<Alias> {
        DEFAULT_ALIASES
            .iter()
            .map(|(action, name)| Alias::new(*action, *name))
            .collect()
    }
}

/// An action with its Firebase handle and dispatch function pre-applied
pub struct BoundMethod {
    name: String,
    action: Option<Arc<dyn ActionDefinition>>,
    firebase: FirebaseHandle,
    dispatch: Dispatch,
}

impl BoundMethod {
    /// Name of the underlying action
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with only the caller's arguments
    ///
    /// A method bound to an action that does not exist fails with
    /// [`ReduxFirestoreError::UnknownAction`] when called.
    pub fn call(&self, args: Vec<Value>) -> MethodFuture {
        let action = self.action.clone();
        let firebase = self.firebase.clone();
        let dispatch = Arc::clone(&self.dispatch);
        let name = self.name.clone();
        async move {
            match action {
                Some(action) => action.run(&firebase, &dispatch, args).await,
                None => Err(ReduxFirestoreError::UnknownAction(name)),
            }
        }
        .boxed()
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .field("bound", &self.action.is_some())
            .field("firebase", &self.firebase.name())
            .finish()
    }
}

/// Helper name → bound method
#[derive(Debug, Clone, Default)]
pub struct HelperMap {
    methods: BTreeMap<String, Arc<BoundMethod>>,
}

impl HelperMap {
    /// Look up a helper
    pub fn get(&self, name: &str) -> Option<&Arc<BoundMethod>> {
        self.methods.get(name)
    }

    /// Whether a helper with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Helper names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    /// Number of helpers
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether there are no helpers
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Call a helper by name
    pub fn call(&self, name: &str, args: Vec<Value>) -> MethodFuture {
        match self.methods.get(name) {
            Some(method) => method.call(args),
            None => {
                let name = name.to_string();
                async move { Err(ReduxFirestoreError::MethodNotFound(name)) }.boxed()
            }
        }
    }

    fn insert(&mut self, name: String, method: Arc<BoundMethod>) {
        self.methods.insert(name, method);
    }
}

/// Bind every action in `actions` and add `aliases`
///
/// An alias shares the binding of its action, so both names behave
/// identically. An alias whose action is missing is still exposed and fails
/// when invoked.
pub fn bind_actions(
    firebase: &FirebaseHandle,
    dispatch: &Dispatch,
    actions: &ActionSet,
    aliases: &[Alias],
) -> HelperMap {
    let bind = |name: &str, action: Option<Arc<dyn ActionDefinition>>| {
        Arc::new(BoundMethod {
            name: name.to_string(),
            action,
            firebase: firebase.clone(),
            dispatch: Arc::clone(dispatch),
        })
    };

    let mut helpers = HelperMap::default();
    for (name, action) in actions.iter() {
        helpers.insert(name.clone(), bind(name.as_str(), Some(Arc::clone(action))));
    }

    for alias in aliases {
        let method = match helpers.get(&alias.action) {
            Some(method) => Arc::clone(method),
            None => {
                tracing::warn!(action = %alias.action, alias = %alias.name, "Alias refers to an unknown action");
                bind(alias.action.as_str(), None)
            }
        };
        helpers.insert(alias.name.clone(), method);
    }

    helpers
}

/// Why an allow-listed native member was not copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The handle has no native Firestore client
    FirestoreUnavailable,
    /// The client has no member with this name
    Missing,
    /// The member exists but is a plain value
    NotCallable,
}

/// An allow-listed native member that was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMethod {
    /// Member name
    pub name: String,
    /// Why it was left out
    pub reason: SkipReason,
}

/// Native methods copied from the client, plus what was left out
#[derive(Debug, Clone, Default)]
pub struct NativeBinding {
    /// Copied methods, still bound to the native client
    pub methods: BTreeMap<String, NativeMethod>,
    /// Allow-listed names that were not copied
    pub skipped: Vec<SkippedMethod>,
}

/// Copy the callable members named in `names` from `firestore`
pub fn bind_native_methods<S: AsRef<str>>(
    firestore: Option<&Arc<dyn NativeFirestore>>,
    names: &[S],
) -> NativeBinding {
    let mut binding = NativeBinding::default();
    for name in names {
        let name = name.as_ref();
        let reason = match firestore.map(|native| native.member(name)) {
            None => SkipReason::FirestoreUnavailable,
            Some(None) => SkipReason::Missing,
            Some(Some(NativeMember::Value(_))) => SkipReason::NotCallable,
            Some(Some(NativeMember::Method(method))) => {
                binding.methods.insert(name.to_string(), method);
                continue;
            }
        };
        tracing::trace!(method = %name, ?reason, "Native method not copied");
        binding.skipped.push(SkippedMethod {
            name: name.to_string(),
            reason,
        });
    }
    binding
}
