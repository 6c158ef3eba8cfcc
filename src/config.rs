//! Configuration merging
//!
//! A [`Config`] is a flat map of option name to JSON value. It always holds
//! every default option; caller overrides replace defaults key by key and
//! unknown keys are carried through untouched.
//!
//! Values are not validated. Typed accessors fall back to the default when a
//! value is missing or has an unexpected JSON type, so bad values show up as
//! behavior differences rather than construction errors.

use crate::constants::{default_config, options};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied partial configuration
pub type ConfigOverrides = Map<String, Value>;

/// Complete redux-firestore configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: Map<String, Value>,
}

impl Config {
    /// Configuration holding only the defaults
    pub fn defaults() -> Self {
        let values = default_config()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        Self { values }
    }

    /// Merge caller overrides onto the defaults
    ///
    /// # Example
    /// ```
    /// use redux_firestore::Config;
    /// use serde_json::json;
    ///
    /// let overrides = json!({ "enableLogging": true, "custom": 1 });
    /// let config = Config::merge(overrides.as_object().cloned().unwrap_or_default());
    ///
    /// assert!(config.enable_logging());
    /// assert_eq!(config.get("custom"), Some(&json!(1)));
    /// assert_eq!(config.get("dispatchOnUnsetListener"), Some(&json!(true)));
    /// ```
    pub fn merge(overrides: ConfigOverrides) -> Self {
        let mut config = Self::defaults();
        config.values.extend(overrides);
        config
    }

    /// Build a config from an arbitrary map without applying defaults
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw value of an option
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a single option
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Whether an option is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// All options
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Consume into the underlying map
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    fn bool_option(&self, key: &str) -> bool {
        match self.values.get(key).and_then(Value::as_bool) {
            Some(value) => value,
            None => default_bool(key),
        }
    }

    /// Install a tracing subscriber at construction time
    pub fn enable_logging(&self) -> bool {
        self.bool_option(options::ENABLE_LOGGING)
    }

    /// Log listener errors through `tracing`
    pub fn log_listener_error(&self) -> bool {
        self.bool_option(options::LOG_LISTENER_ERROR)
    }

    /// Allow attaching a listener whose name is already registered
    pub fn allow_multiple_listeners(&self) -> bool {
        self.bool_option(options::ALLOW_MULTIPLE_LISTENERS)
    }

    /// Dispatch `UNSET_LISTENER` when a listener is removed
    pub fn dispatch_on_unset_listener(&self) -> bool {
        self.bool_option(options::DISPATCH_ON_UNSET_LISTENER)
    }

    /// Namespace for bound action methods; `None` places them at top level
    ///
    /// A non-empty string is used as is and a non-zero number or `true` is
    /// stringified. `null`, `false`, `0`, `""`, arrays and objects leave the
    /// methods at the top level.
    pub fn helpers_namespace(&self) -> Option<String> {
        match self.values.get(options::HELPERS_NAMESPACE)? {
            Value::String(value) if !value.is_empty() => Some(value.clone()),
            Value::Number(value) if value.as_f64().map_or(false, |n| n != 0.0) => {
                Some(value.to_string())
            }
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }
}

fn default_bool(key: &str) -> bool {
    default_config()
        .into_iter()
        .find(|(name, _)| *name == key)
        .and_then(|(_, value)| value.as_bool())
        .unwrap_or(false)
}
