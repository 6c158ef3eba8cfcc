//! Constants shared across the crate
//!
//! Option names and their defaults, the allow-list of native Firestore
//! methods copied onto the extended instance, and the default method aliases.

use serde_json::Value;

/// Prefix of every dispatched action type
pub const ACTION_PREFIX: &str = "@@reduxFirestore";

/// Key under which internal state is exposed on the extended instance
pub const INTERNALS_KEY: &str = "_";

/// Option names understood by redux-firestore
pub mod options {
    #![allow(missing_docs)]

    pub const AUTO_POPULATE_PROFILE: &str = "autoPopulateProfile";
    pub const DISPATCH_ON_UNSET_LISTENER: &str = "dispatchOnUnsetListener";
    pub const ENABLE_EMPTY_AUTH_CHANGES: &str = "enableEmptyAuthChanges";
    pub const ENABLE_LOGGING: &str = "enableLogging";
    pub const ENABLE_REDIRECT_HANDLING: &str = "enableRedirectHandling";
    pub const SET_PROFILE_POPULATE_RESULTS: &str = "setProfilePopulateResults";
    pub const UPDATE_PROFILE_ON_LOGIN: &str = "updateProfileOnLogin";
    pub const USER_PROFILE: &str = "userProfile";
    pub const HELPERS_NAMESPACE: &str = "helpersNamespace";
    pub const LOG_LISTENER_ERROR: &str = "logListenerError";
    pub const ALLOW_MULTIPLE_LISTENERS: &str = "allowMultipleListeners";
}

/// Default configuration, as `(option, value)` pairs
pub fn default_config() -> Vec<(&'static str, Value)> {
    use options::*;

    vec![
        (AUTO_POPULATE_PROFILE, Value::Bool(false)),
        (DISPATCH_ON_UNSET_LISTENER, Value::Bool(true)),
        (ENABLE_EMPTY_AUTH_CHANGES, Value::Bool(false)),
        (ENABLE_LOGGING, Value::Bool(false)),
        (ENABLE_REDIRECT_HANDLING, Value::Bool(true)),
        (SET_PROFILE_POPULATE_RESULTS, Value::Bool(false)),
        (UPDATE_PROFILE_ON_LOGIN, Value::Bool(true)),
        (USER_PROFILE, Value::Null),
        (HELPERS_NAMESPACE, Value::Null),
        (LOG_LISTENER_ERROR, Value::Bool(true)),
        (ALLOW_MULTIPLE_LISTENERS, Value::Bool(false)),
    ]
}

/// Native Firestore methods copied onto the extended instance.
///
/// Everything else on the native client is only reachable through the
/// native surface or in action-wrapped form.
pub const METHODS_TO_ADD_FROM_FIRESTORE: &[&str] = &[
    "collection",
    "configureClient",
    "doc",
    "batch",
    "disableNetwork",
    "enableNetwork",
    "enablePersistence",
    "ensureClientConfigured",
    "setLogLevel",
    "settings",
];

/// Default `(action, alias)` pairs
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[("deleteRef", "delete"), ("setListener", "onSnapshot")];
