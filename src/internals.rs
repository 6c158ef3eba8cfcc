//! Internal state attached to the Firebase handle
//!
//! [`Internals`] holds the merged configuration and the [`ListenerRegistry`].
//! Other integrations sharing the handle may have attached internal state
//! first, so new state is merged with what is already there instead of
//! replacing it.

use crate::config::Config;
use crate::firestore::{ListenerRegistration, QueryMeta};
use crate::util::deep_merge_maps;
use serde_json::{Map, Value};
use std::collections::btree_map::{self, BTreeMap};

/// A tracked subscription
#[derive(Debug, Default)]
pub struct ListenerEntry {
    meta: Option<QueryMeta>,
    registration: Option<ListenerRegistration>,
}

impl ListenerEntry {
    /// Entry for an active subscription
    pub fn new(meta: QueryMeta, registration: ListenerRegistration) -> Self {
        Self {
            meta: Some(meta),
            registration: Some(registration),
        }
    }

    /// Entry reserved for `meta` while its subscription is being created
    pub fn pending(meta: QueryMeta) -> Self {
        Self {
            meta: Some(meta),
            registration: None,
        }
    }

    /// Entry without a live subscription, e.g. recorded by another integration
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Query the subscription was created for
    pub fn meta(&self) -> Option<&QueryMeta> {
        self.meta.as_ref()
    }

    /// Whether a native subscription backs this entry
    pub fn is_active(&self) -> bool {
        self.registration.is_some()
    }

    /// Stop the underlying subscription
    pub fn unsubscribe(mut self) {
        if let Some(registration) = self.registration.take() {
            registration.remove();
        }
    }
}

/// Listener name → subscription
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    entries: BTreeMap<String, ListenerEntry>,
}

impl ListenerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a listener, returning the entry it replaced
    pub fn insert(&mut self, name: impl Into<String>, entry: ListenerEntry) -> Option<ListenerEntry> {
        self.entries.insert(name.into(), entry)
    }

    /// Stop tracking a listener
    pub fn remove(&mut self, name: &str) -> Option<ListenerEntry> {
        self.entries.remove(name)
    }

    /// Look up a listener
    pub fn get(&self, name: &str) -> Option<&ListenerEntry> {
        self.entries.get(name)
    }

    /// Whether a listener with this name is tracked
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Tracked names, sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of tracked listeners
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add entries from `other` whose names are not tracked yet
    fn absorb(&mut self, other: ListenerRegistry) {
        for (name, entry) in other.entries {
            if let btree_map::Entry::Vacant(slot) = self.entries.entry(name) {
                slot.insert(entry);
            }
        }
    }
}

/// Internal state stored on the Firebase handle
#[derive(Debug, Default)]
pub struct Internals {
    /// Active listeners
    pub listeners: ListenerRegistry,

    /// Merged configuration
    pub config: Config,

    /// Fields set by other integrations sharing the handle
    pub extensions: Map<String, Value>,
}

impl Internals {
    /// Fresh state: no listeners, the given config
    pub fn new(config: Config) -> Self {
        Self {
            listeners: ListenerRegistry::new(),
            config,
            extensions: Map::new(),
        }
    }

    /// Merge `self` (freshly built state) with the state already on the handle
    ///
    /// Objects merge recursively and nothing present in `existing` is
    /// dropped. On a leaf collision the existing value is kept, so a field an
    /// earlier integration set survives a later setup.
    pub fn merge(self, existing: Internals) -> Internals {
        let mut listeners = existing.listeners;
        listeners.absorb(self.listeners);

        let mut config = self.config.into_map();
        deep_merge_maps(&mut config, existing.config.into_map());

        let mut extensions = self.extensions;
        deep_merge_maps(&mut extensions, existing.extensions);

        Internals {
            listeners,
            config: Config::from_map(config),
            extensions,
        }
    }
}
