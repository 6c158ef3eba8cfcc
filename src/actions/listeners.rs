//! Snapshot listeners
//!
//! Listeners are tracked by query name in the handle's [`ListenerRegistry`]
//! so they can be detached later. Snapshots arrive as `LISTENER_RESPONSE`
//! actions; a listener that errors is dropped from the registry and reported
//! as `LISTENER_ERROR`.
//!
//! [`ListenerRegistry`]: crate::internals::ListenerRegistry

use super::{native, query_arg, query_list_arg, ActionDefinition};
use crate::action::{Action, ActionType, Dispatch};
use crate::app::{FirebaseHandle, WeakFirebaseHandle};
use crate::error::{FirestoreError, ReduxFirestoreError};
use crate::firestore::{QueryMeta, Snapshot, SnapshotCallback};
use crate::internals::ListenerEntry;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn meta_value(meta: &QueryMeta) -> Value {
    serde_json::to_value(meta).unwrap_or(Value::Null)
}

fn listener_error(meta: &QueryMeta, err: &ReduxFirestoreError) -> Action {
    Action::new(ActionType::ListenerError)
        .with_meta(meta_value(meta))
        .with_payload(serde_json::to_value(err.to_payload()).unwrap_or(Value::Null))
}

/// Callback for one attach
///
/// `terminated` is set before the registry entry is dropped, so an error
/// delivered while `on_snapshot` is still running is seen by [`attach`].
fn snapshot_callback(
    firebase: WeakFirebaseHandle,
    dispatch: Dispatch,
    meta: QueryMeta,
    name: String,
    terminated: Arc<AtomicBool>,
) -> SnapshotCallback {
    Arc::new(move |result: Result<Snapshot, FirestoreError>| match result {
        Ok(snapshot) => {
            dispatch(
                Action::new(ActionType::ListenerResponse)
                    .with_meta(meta_value(&meta))
                    .with_payload(snapshot.to_payload()),
            );
        }
        Err(err) => {
            terminated.store(true, Ordering::SeqCst);
            if let Some(firebase) = firebase.upgrade() {
                if firebase.config().log_listener_error() {
                    tracing::error!(listener = %name, error = %err, "Error with Firestore listener");
                }
                let entry = firebase.internals_mut().listeners.remove(&name);
                if let Some(entry) = entry {
                    entry.unsubscribe();
                }
            }
            dispatch(listener_error(&meta, &ReduxFirestoreError::from(err)));
        }
    })
}

/// Subscribe to `meta` and track it under its query name
///
/// The registry slot is reserved and `SET_LISTENER` dispatched before the
/// client subscribes, so every snapshot or error follows `SET_LISTENER`. A
/// subscription that fails, or errors before `on_snapshot` returns, leaves
/// nothing tracked.
fn attach(
    firebase: &FirebaseHandle,
    dispatch: &Dispatch,
    meta: QueryMeta,
) -> Result<String, ReduxFirestoreError> {
    let native = native(firebase)?;
    let name = meta.query_name();

    let replaced = firebase
        .internals_mut()
        .listeners
        .insert(name.clone(), ListenerEntry::pending(meta.clone()));
    if let Some(previous) = replaced {
        tracing::debug!(listener = %name, "Replacing existing listener");
        previous.unsubscribe();
    }

    dispatch(
        Action::new(ActionType::SetListener)
            .with_meta(meta_value(&meta))
            .with_payload(json!({ "name": name })),
    );

    let terminated = Arc::new(AtomicBool::new(false));
    let callback = snapshot_callback(
        firebase.downgrade(),
        Arc::clone(dispatch),
        meta.clone(),
        name.clone(),
        Arc::clone(&terminated),
    );

    let registration = match native.on_snapshot(&meta, callback) {
        Ok(registration) => registration,
        Err(err) => {
            firebase.internals_mut().listeners.remove(&name);
            let err = ReduxFirestoreError::from(err);
            dispatch(listener_error(&meta, &err));
            return Err(err);
        }
    };

    let mut internals = firebase.internals_mut();
    if terminated.load(Ordering::SeqCst) {
        drop(internals);
        tracing::debug!(listener = %name, "Listener errored while subscribing");
        registration.remove();
    } else {
        internals
            .listeners
            .insert(name.clone(), ListenerEntry::new(meta, registration));
    }
    Ok(name)
}

/// Stop and forget the listener for `meta`, if any
fn detach(firebase: &FirebaseHandle, dispatch: &Dispatch, meta: &QueryMeta) -> bool {
    let name = meta.query_name();
    let entry = firebase.internals_mut().listeners.remove(&name);
    let found = entry.is_some();
    if let Some(entry) = entry {
        entry.unsubscribe();
    }

    if firebase.config().dispatch_on_unset_listener() {
        dispatch(
            Action::new(ActionType::UnsetListener)
                .with_meta(meta_value(meta))
                .with_payload(json!({ "name": name })),
        );
    }
    found
}

/// `setListener(query)`: subscribe to a document or query
///
/// Succeeds with `{ name }`. Attaching a listener under a name that is
/// already tracked replaces the old subscription.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetListener;

#[async_trait]
impl ActionDefinition for SetListener {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let meta = query_arg(&args, 0)?;
        let name = attach(firebase, dispatch, meta)?;
        Ok(json!({ "name": name }))
    }
}

/// `setListeners([query, ...])`: subscribe to several queries
///
/// Queries whose name is already tracked are skipped unless
/// `allowMultipleListeners` is set. Succeeds with the attached names.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetListeners;

#[async_trait]
impl ActionDefinition for SetListeners {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let queries = query_list_arg(&args, 0)?;
        let allow_multiple = firebase.config().allow_multiple_listeners();

        let mut names = Vec::with_capacity(queries.len());
        for meta in queries {
            let exists = firebase.internals().listeners.contains(&meta.query_name());
            if exists && !allow_multiple {
                tracing::trace!(listener = %meta.query_name(), "Listener already attached");
                continue;
            }
            names.push(Value::String(attach(firebase, dispatch, meta)?));
        }
        Ok(Value::Array(names))
    }
}

/// `unsetListener(query)`: detach a listener
///
/// Succeeds with `{ name, removed }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsetListener;

#[async_trait]
impl ActionDefinition for UnsetListener {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let meta = query_arg(&args, 0)?;
        let removed = detach(firebase, dispatch, &meta);
        Ok(json!({ "name": meta.query_name(), "removed": removed }))
    }
}

/// `unsetListeners([query, ...])`: detach several listeners
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsetListeners;

#[async_trait]
impl ActionDefinition for UnsetListeners {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let queries = query_list_arg(&args, 0)?;
        let names: Vec<Value> = queries
            .iter()
            .map(|meta| {
                detach(firebase, dispatch, meta);
                Value::String(meta.query_name())
            })
            .collect();
        Ok(Value::Array(names))
    }
}
