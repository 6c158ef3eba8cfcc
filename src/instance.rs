//! Extended Firestore instance
//!
//! [`create_firestore_instance`] merges configuration, attaches internal state
//! to the Firebase handle, binds the action methods and the allow-listed
//! native methods, and assembles them into an [`ExtendedFirestore`]. The
//! result replaces the process-wide instance returned by [`get_firestore`].
//!
//! Top-level names resolve in this order, first match wins:
//!
//! 1. bound action methods, or the single `helpersNamespace` entry holding them
//! 2. internal state under `_`
//! 3. the native client's own surface
//! 4. allow-listed native methods

use crate::action::Dispatch;
use crate::actions::ActionSet;
use crate::app::FirebaseHandle;
use crate::binder::{
    bind_actions, bind_native_methods, Alias, BoundMethod, HelperMap, MethodFuture, SkippedMethod,
};
use crate::config::{Config, ConfigOverrides};
use crate::constants::{INTERNALS_KEY, METHODS_TO_ADD_FROM_FIRESTORE};
use crate::error::ReduxFirestoreError;
use crate::firestore::{NativeMember, NativeMethod};
use crate::internals::Internals;
use crate::logging;
use futures::{FutureExt, TryFutureExt};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// The current extended instance
static FIRESTORE_INSTANCE: Lazy<RwLock<Option<Arc<ExtendedFirestore>>>> =
    Lazy::new(|| RwLock::new(None));

/// Where the bound action methods live
#[derive(Debug, Clone)]
pub enum Helpers {
    /// Directly on the instance
    TopLevel(HelperMap),
    /// Under a single namespace key
    Namespaced {
        /// The `helpersNamespace` value
        namespace: String,
        /// The bound methods
        methods: HelperMap,
    },
}

impl Helpers {
    /// The bound methods, wherever they are placed
    pub fn methods(&self) -> &HelperMap {
        match self {
            Helpers::TopLevel(methods) => methods,
            Helpers::Namespaced { methods, .. } => methods,
        }
    }
}

/// A top-level name of the extended instance
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    /// A bound action method
    Helper(&'a Arc<BoundMethod>),
    /// The namespace holding the bound action methods
    Namespace(&'a HelperMap),
    /// The internal state key
    Internals,
    /// A member of the native client
    Native(&'a NativeMember),
}

/// Firestore client extended with dispatching action methods
pub struct ExtendedFirestore {
    native_methods: BTreeMap<String, NativeMember>,
    skipped: Vec<SkippedMethod>,
    native_surface: BTreeMap<String, NativeMember>,
    firebase: FirebaseHandle,
    helpers: Helpers,
    config: Config,
}

impl ExtendedFirestore {
    /// Resolve a top-level name
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        match &self.helpers {
            Helpers::TopLevel(methods) => {
                if let Some(method) = methods.get(name) {
                    return Some(Member::Helper(method));
                }
            }
            Helpers::Namespaced { namespace, methods } => {
                if namespace == name {
                    return Some(Member::Namespace(methods));
                }
            }
        }
        if name == INTERNALS_KEY {
            return Some(Member::Internals);
        }
        self.native_surface
            .get(name)
            .or_else(|| self.native_methods.get(name))
            .map(Member::Native)
    }

    /// Whether `name` resolves at the top level
    pub fn contains(&self, name: &str) -> bool {
        self.member(name).is_some()
    }

    /// Call a top-level method
    ///
    /// Native methods run against their own client; their errors are
    /// wrapped in [`ReduxFirestoreError::Firestore`].
    pub fn call(&self, name: &str, args: Vec<Value>) -> MethodFuture {
        match self.member(name) {
            Some(Member::Helper(method)) => method.call(args),
            Some(Member::Native(NativeMember::Method(method))) => {
                method.call(args).err_into::<ReduxFirestoreError>().boxed()
            }
            _ => {
                let name = name.to_string();
                async move { Err(ReduxFirestoreError::MethodNotFound(name)) }.boxed()
            }
        }
    }

    /// Plain value exposed by the native client
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.member(name) {
            Some(Member::Native(member)) => member.as_value(),
            _ => None,
        }
    }

    /// Top-level names, sorted
    pub fn keys(&self) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = self.native_methods.keys().cloned().collect();
        keys.extend(self.native_surface.keys().cloned());
        keys.insert(INTERNALS_KEY.to_string());
        match &self.helpers {
            Helpers::TopLevel(methods) => keys.extend(methods.names().into_iter().map(String::from)),
            Helpers::Namespaced { namespace, .. } => {
                keys.insert(namespace.clone());
            }
        }
        keys
    }

    /// Bound action methods and their placement
    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Bound action methods when placed under a namespace
    pub fn namespace(&self) -> Option<(&str, &HelperMap)> {
        match &self.helpers {
            Helpers::Namespaced { namespace, methods } => Some((namespace, methods)),
            Helpers::TopLevel(_) => None,
        }
    }

    /// Allow-listed native methods copied onto the instance
    pub fn native_method(&self, name: &str) -> Option<&NativeMethod> {
        self.native_methods.get(name).and_then(NativeMember::as_method)
    }

    /// Allow-listed native methods that were not copied
    pub fn skipped_methods(&self) -> &[SkippedMethod] {
        &self.skipped
    }

    /// The Firebase handle this instance extends
    pub fn firebase(&self) -> &FirebaseHandle {
        &self.firebase
    }

    /// Internal state (`_`) shared with the handle
    pub fn internals(&self) -> RwLockReadGuard<'_, Internals> {
        self.firebase.internals()
    }

    /// Configuration this instance was built with
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl fmt::Debug for ExtendedFirestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedFirestore")
            .field("firebase", &self.firebase)
            .field("keys", &self.keys())
            .field("skipped", &self.skipped)
            .finish()
    }
}

/// Builder for [`ExtendedFirestore`]
///
/// # Example
/// ```
/// use redux_firestore::{dispatch_fn, FirebaseHandle, FirestoreInstanceBuilder, MemoryFirestore};
/// use serde_json::json;
///
/// let firebase = FirebaseHandle::with_firestore(MemoryFirestore::new());
/// let instance = FirestoreInstanceBuilder::new(&firebase, dispatch_fn(|_| {}))
///     .config(json!({ "helpersNamespace": "store" }).as_object().cloned().unwrap_or_default())
///     .build();
///
/// assert!(instance.namespace().is_some());
/// assert!(!instance.contains("onSnapshot"));
/// ```
pub struct FirestoreInstanceBuilder {
    firebase: FirebaseHandle,
    dispatch: Dispatch,
    overrides: ConfigOverrides,
    actions: ActionSet,
    aliases: Vec<Alias>,
    native_methods: Vec<String>,
}

impl FirestoreInstanceBuilder {
    /// Standard actions, default aliases and the default allow-list
    pub fn new(firebase: &FirebaseHandle, dispatch: Dispatch) -> Self {
        Self {
            firebase: firebase.clone(),
            dispatch,
            overrides: ConfigOverrides::new(),
            actions: ActionSet::firestore(),
            aliases: Alias::defaults(),
            native_methods: METHODS_TO_ADD_FROM_FIRESTORE
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    /// Caller configuration, merged over the defaults
    pub fn config(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the action set
    pub fn actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    /// Replace the aliases
    pub fn aliases(mut self, aliases: Vec<Alias>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Replace the native method allow-list
    pub fn native_methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.native_methods = names.into_iter().map(Into::into).collect();
        self
    }

    /// Assemble the instance and make it the process-wide one
    pub fn build(self) -> Arc<ExtendedFirestore> {
        let config = Config::merge(self.overrides);
        if config.enable_logging() {
            logging::init();
        }

        self.firebase.extend_app(Internals::new(config.clone()));

        let methods = bind_actions(&self.firebase, &self.dispatch, &self.actions, &self.aliases);
        let helpers = match config.helpers_namespace() {
            Some(namespace) => Helpers::Namespaced { namespace, methods },
            None => Helpers::TopLevel(methods),
        };

        let native = self.firebase.firestore();
        let binding = bind_native_methods(native.as_ref(), self.native_methods.as_slice());
        let native_surface = native
            .as_ref()
            .map(|native| native.surface().into_iter().collect())
            .unwrap_or_default();

        let instance = Arc::new(ExtendedFirestore {
            native_methods: binding
                .methods
                .into_iter()
                .map(|(name, method)| (name, NativeMember::Method(method)))
                .collect(),
            skipped: binding.skipped,
            native_surface,
            firebase: self.firebase,
            helpers,
            config,
        });

        tracing::debug!(
            app = %instance.firebase.name(),
            helpers = instance.helpers.methods().len(),
            native_methods = instance.native_methods.len(),
            skipped = instance.skipped.len(),
            namespace = ?instance.namespace().map(|(namespace, _)| namespace),
            "Created Firestore instance"
        );

        let previous = FIRESTORE_INSTANCE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&instance));
        if previous.is_some() {
            tracing::debug!("Replaced previous Firestore instance");
        }

        instance
    }
}

/// Create the extended instance with the standard actions
///
/// The returned instance also becomes the one [`get_firestore`] returns.
pub fn create_firestore_instance(
    firebase: &FirebaseHandle,
    overrides: ConfigOverrides,
    dispatch: Dispatch,
) -> Arc<ExtendedFirestore> {
    FirestoreInstanceBuilder::new(firebase, dispatch)
        .config(overrides)
        .build()
}

/// The most recently created instance
///
/// # Errors
/// [`ReduxFirestoreError::InstanceNotInitialized`] if no instance was created yet.
pub fn get_firestore() -> Result<Arc<ExtendedFirestore>, ReduxFirestoreError> {
    FIRESTORE_INSTANCE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(ReduxFirestoreError::InstanceNotInitialized)
}
