//! Integration tests for the extended Firestore instance
//!
//! Every test runs against `MemoryFirestore`. Tests that create an instance
//! replace the process-wide one, so they hold `SERIAL` while running. The
//! lock is async so tokio tests can keep it across `.await`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redux_firestore::firestore::{ListenerRegistration, SetOptions, SnapshotCallback};
use redux_firestore::{
    create_firestore_instance, dispatch_fn, get_firestore, Action, ActionSet, ActionType, Alias,
    Config, ConfigOverrides, Dispatch, FirebaseHandle, FirestoreError, FirestoreInstanceBuilder,
    ListenerEntry, Member, MemoryFirestore, NativeFirestore, NativeMember, QueryMeta,
    ReduxFirestoreError, SkipReason, Snapshot, METHODS_TO_ADD_FROM_FIRESTORE,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

static SERIAL: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

fn overrides(value: Value) -> ConfigOverrides {
    value.as_object().cloned().expect("object literal")
}

/// Dispatch that records every action it receives
fn recorder() -> (Dispatch, Arc<Mutex<Vec<Action>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (dispatch_fn(move |action| sink.lock().unwrap().push(action)), seen)
}

fn drain(seen: &Arc<Mutex<Vec<Action>>>) -> Vec<(ActionType, Option<Value>)> {
    seen.lock()
        .unwrap()
        .drain(..)
        .map(|action| (action.action_type, action.payload))
        .collect()
}

fn seeded_store() -> MemoryFirestore {
    MemoryFirestore::with_documents(vec![
        ("cities/SF", json!({ "name": "San Francisco", "population": 870000 })),
        ("cities/LA", json!({ "name": "Los Angeles", "population": 3900000 })),
    ])
}

#[test]
fn test_config_merge_over_defaults() {
    let _guard = SERIAL.blocking_lock();
    let firebase = FirebaseHandle::with_firestore(MemoryFirestore::new());
    let instance = create_firestore_instance(
        &firebase,
        overrides(json!({ "enableRedirectHandling": false, "customOption": { "x": 1 } })),
        dispatch_fn(|_| {}),
    );

    let config = instance.config();
    for key in Config::defaults().as_map().keys() {
        assert!(config.contains_key(key), "missing default {}", key);
    }
    assert_eq!(config.get("enableRedirectHandling"), Some(&json!(false)));
    assert_eq!(config.get("dispatchOnUnsetListener"), Some(&json!(true)));
    assert_eq!(config.get("customOption"), Some(&json!({ "x": 1 })));
    assert_eq!(firebase.config().get("customOption"), Some(&json!({ "x": 1 })));
}

#[tokio::test]
async fn test_alias_matches_canonical_delete() {
    let _guard = SERIAL.lock().await;
    let store = seeded_store();
    let firebase = FirebaseHandle::with_firestore(store.clone());
    let (dispatch, seen) = recorder();
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch);

    instance.call("deleteRef", vec![json!("cities/SF")]).await.unwrap();
    let canonical = drain(&seen);
    let canonical_calls = store.calls();

    store.clear_calls();
    instance.call("delete", vec![json!("cities/SF")]).await.unwrap();
    let aliased = drain(&seen);

    assert_eq!(canonical, aliased);
    assert_eq!(canonical_calls, store.calls());
    assert_eq!(
        canonical.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
        vec![ActionType::DeleteRequest, ActionType::DeleteSuccess]
    );
}

#[tokio::test]
async fn test_alias_matches_canonical_listener() {
    let _guard = SERIAL.lock().await;
    let (dispatch, seen) = recorder();

    let store = seeded_store();
    let firebase = FirebaseHandle::with_firestore(store.clone());
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), Arc::clone(&dispatch));
    instance.call("setListener", vec![json!("cities")]).await.unwrap();
    let canonical = drain(&seen);

    let alias_store = seeded_store();
    let alias_firebase = FirebaseHandle::with_firestore(alias_store.clone());
    let instance = create_firestore_instance(&alias_firebase, ConfigOverrides::new(), dispatch);
    instance.call("onSnapshot", vec![json!("cities")]).await.unwrap();
    let aliased = drain(&seen);

    assert_eq!(canonical, aliased);
    assert_eq!(store.calls(), alias_store.calls());
    assert_eq!(store.calls(), vec!["onSnapshot cities"]);
}

#[tokio::test]
async fn test_allow_listed_native_methods() {
    let _guard = SERIAL.lock().await;
    let store = MemoryFirestore::new();
    let firebase = FirebaseHandle::with_firestore(store.clone());
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch_fn(|_| {}));

    let copied = instance.call("doc", vec![json!("cities/SF")]).await.unwrap();
    let direct = store
        .member("doc")
        .and_then(|member| member.as_method().cloned())
        .expect("doc is callable")
        .call(vec![json!("cities/SF")])
        .await
        .unwrap();
    assert_eq!(copied, direct);

    for name in ["batch", "settings", "configureClient", "enablePersistence"] {
        assert!(!instance.keys().contains(name), "{} should be skipped", name);
    }
    let settings = instance
        .skipped_methods()
        .iter()
        .find(|skip| skip.name == "settings")
        .expect("settings recorded");
    assert_eq!(settings.reason, SkipReason::NotCallable);
    let callable = ["collection", "doc", "disableNetwork", "enableNetwork", "setLogLevel"];
    for name in callable {
        assert!(instance.native_method(name).is_some(), "{} should be copied", name);
    }
    assert_eq!(
        instance.skipped_methods().len() + callable.len(),
        METHODS_TO_ADD_FROM_FIRESTORE.len()
    );

    instance.call("setLogLevel", vec![json!("debug")]).await.unwrap();
    assert_eq!(store.log_level(), "debug");
}

#[tokio::test]
async fn test_namespace_scenario() {
    let _guard = SERIAL.lock().await;
    let firebase = FirebaseHandle::with_firestore(seeded_store());
    let (dispatch, seen) = recorder();
    let instance = FirestoreInstanceBuilder::new(&firebase, dispatch)
        .config(overrides(json!({ "helpersNamespace": "store" })))
        .aliases(vec![Alias::new("setListener", "onSnapshot")])
        .build();

    let Some(Member::Namespace(store)) = instance.member("store") else {
        panic!("store namespace missing");
    };
    assert!(Arc::ptr_eq(store.get("onSnapshot").unwrap(), store.get("setListener").unwrap()));
    assert!(!store.contains("delete"));
    assert!(instance.member("onSnapshot").is_none());
    assert!(instance.member("setListener").is_none());
    assert!(instance.member("collection").is_some());

    store.call("onSnapshot", vec![json!("cities/LA")]).await.unwrap();
    assert!(firebase.internals().listeners.contains("cities/LA"));
    assert!(!drain(&seen).is_empty());
}

#[test]
fn test_singleton_last_construction_wins() {
    let _guard = SERIAL.blocking_lock();
    let first_handle = FirebaseHandle::with_firestore(MemoryFirestore::new());
    let second_handle = FirebaseHandle::with_firestore(MemoryFirestore::new());

    let first = create_firestore_instance(&first_handle, ConfigOverrides::new(), dispatch_fn(|_| {}));
    assert!(Arc::ptr_eq(&get_firestore().unwrap(), &first));

    let second = create_firestore_instance(&second_handle, ConfigOverrides::new(), dispatch_fn(|_| {}));
    let current = get_firestore().unwrap();
    assert!(Arc::ptr_eq(&current, &second));
    assert!(current.firebase().ptr_eq(&second_handle));
}

#[test]
fn test_internal_state_merge_keeps_existing_listeners() {
    let _guard = SERIAL.blocking_lock();
    let firebase = FirebaseHandle::with_firestore(MemoryFirestore::new());
    firebase
        .internals_mut()
        .listeners
        .insert("a", ListenerEntry::placeholder());
    firebase
        .internals_mut()
        .extensions
        .insert("auth".to_string(), json!({ "uid": "abc" }));

    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch_fn(|_| {}));

    let internals = instance.internals();
    assert!(internals.listeners.contains("a"));
    assert_eq!(internals.config.get("enableLogging"), Some(&json!(false)));
    assert_eq!(internals.extensions["auth"], json!({ "uid": "abc" }));
}

#[tokio::test]
async fn test_listener_lifecycle() {
    let _guard = SERIAL.lock().await;
    let store = seeded_store();
    let firebase = FirebaseHandle::with_firestore(store.clone());
    let (dispatch, seen) = recorder();
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch);

    let query = json!({ "collection": "cities", "orderBy": ["population", "desc"], "limit": 1 });
    let result = instance.call("onSnapshot", vec![query.clone()]).await.unwrap();
    let name = result["name"].as_str().unwrap().to_string();
    assert!(firebase.internals().listeners.contains(&name));

    let first = drain(&seen);
    assert_eq!(first[0].0, ActionType::SetListener);
    assert_eq!(first[1].0, ActionType::ListenerResponse);
    assert_eq!(first[1].1.as_ref().unwrap()["ordered"][0]["id"], json!("LA"));

    instance
        .call("add", vec![json!("cities"), json!({ "name": "Tokyo", "population": 14000000 })])
        .await
        .unwrap();
    let response = drain(&seen)
        .into_iter()
        .find(|(t, _)| *t == ActionType::ListenerResponse)
        .expect("listener saw the write");
    assert_eq!(response.1.unwrap()["ordered"][0]["name"], json!("Tokyo"));

    instance.call("unsetListener", vec![query]).await.unwrap();
    assert!(!firebase.internals().listeners.contains(&name));
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn test_listener_error_clears_registry() {
    let _guard = SERIAL.lock().await;
    let store = seeded_store();
    let firebase = FirebaseHandle::with_firestore(store.clone());
    let (dispatch, seen) = recorder();
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch);

    instance.call("onSnapshot", vec![json!("cities/SF")]).await.unwrap();
    drain(&seen);

    store.fail_listeners("cities/SF", FirestoreError::PermissionDenied);
    assert!(firebase.internals().listeners.is_empty());
    let actions = drain(&seen);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].0, ActionType::ListenerError);
}

/// How [`RejectingFirestore`] fails a subscription
#[derive(Clone, Copy)]
enum Rejection {
    /// Deliver a terminal error from inside `on_snapshot`, then return a registration
    ErrorWhileSubscribing,
    /// Return an error from `on_snapshot` itself
    Refuse,
}

/// Client whose listeners never get a snapshot
struct RejectingFirestore {
    rejection: Rejection,
    removed: Arc<AtomicBool>,
}

#[async_trait]
impl NativeFirestore for RejectingFirestore {
    async fn get(&self, _query: &QueryMeta) -> Result<Snapshot, FirestoreError> {
        Err(FirestoreError::Unimplemented)
    }

    async fn set(&self, _path: &str, _data: Value, _options: SetOptions) -> Result<(), FirestoreError> {
        Err(FirestoreError::Unimplemented)
    }

    async fn add(&self, _collection_path: &str, _data: Value) -> Result<String, FirestoreError> {
        Err(FirestoreError::Unimplemented)
    }

    async fn update(&self, _path: &str, _data: Value) -> Result<(), FirestoreError> {
        Err(FirestoreError::Unimplemented)
    }

    async fn delete(&self, _path: &str) -> Result<(), FirestoreError> {
        Err(FirestoreError::Unimplemented)
    }

    fn on_snapshot(
        &self,
        _query: &QueryMeta,
        callback: SnapshotCallback,
    ) -> Result<ListenerRegistration, FirestoreError> {
        match self.rejection {
            Rejection::ErrorWhileSubscribing => {
                callback(Err(FirestoreError::PermissionDenied));
                let removed = Arc::clone(&self.removed);
                Ok(ListenerRegistration::new(move || removed.store(true, Ordering::SeqCst)))
            }
            Rejection::Refuse => Err(FirestoreError::InvalidArgument("unsupported query".into())),
        }
    }

    fn member(&self, _name: &str) -> Option<NativeMember> {
        None
    }
}

fn rejecting(rejection: Rejection) -> (FirebaseHandle, Arc<AtomicBool>) {
    let removed = Arc::new(AtomicBool::new(false));
    let client = RejectingFirestore {
        rejection,
        removed: Arc::clone(&removed),
    };
    (FirebaseHandle::with_firestore(client), removed)
}

#[tokio::test]
async fn test_listener_error_while_subscribing_is_not_tracked() {
    let _guard = SERIAL.lock().await;
    let (firebase, removed) = rejecting(Rejection::ErrorWhileSubscribing);
    let (dispatch, seen) = recorder();
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch);

    let result = instance.call("setListener", vec![json!("cities")]).await.unwrap();
    assert_eq!(result, json!({ "name": "cities" }));

    let actions = drain(&seen);
    assert_eq!(
        actions.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
        vec![ActionType::SetListener, ActionType::ListenerError]
    );
    assert_eq!(actions[1].1.as_ref().unwrap()["code"], json!("permission-denied"));
    assert!(firebase.internals().listeners.is_empty());
    assert!(removed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_refused_subscription_is_not_tracked() {
    let _guard = SERIAL.lock().await;
    let (firebase, _removed) = rejecting(Rejection::Refuse);
    let (dispatch, seen) = recorder();
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch);

    let err = instance
        .call("onSnapshot", vec![json!("cities/SF")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReduxFirestoreError::Firestore(FirestoreError::InvalidArgument(_))
    ));

    let actions = drain(&seen);
    assert_eq!(
        actions.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
        vec![ActionType::SetListener, ActionType::ListenerError]
    );
    assert_eq!(actions[1].1.as_ref().unwrap()["code"], json!("invalid-argument"));
    assert!(firebase.internals().listeners.is_empty());
}

#[tokio::test]
async fn test_downstream_errors_propagate_unchanged() {
    let _guard = SERIAL.lock().await;
    let store = seeded_store();
    let firebase = FirebaseHandle::with_firestore(store.clone());
    let (dispatch, seen) = recorder();
    let instance = create_firestore_instance(&firebase, ConfigOverrides::new(), dispatch);

    store.set_offline(true);
    let err = instance
        .call("update", vec![json!("cities/SF"), json!({ "population": 1 })])
        .await
        .unwrap_err();
    assert!(matches!(err, ReduxFirestoreError::Firestore(FirestoreError::Unavailable)));

    let actions = drain(&seen);
    assert_eq!(actions[1].0, ActionType::UpdateFailure);
    assert_eq!(actions[1].1.as_ref().unwrap()["code"], json!("unavailable"));

    instance.call("enableNetwork", vec![]).await.unwrap();
    assert!(!store.is_offline());
}

#[test]
fn test_construction_without_firestore_fails_late() {
    let _guard = SERIAL.blocking_lock();
    let firebase = FirebaseHandle::without_firestore("bare");
    let instance = FirestoreInstanceBuilder::new(&firebase, dispatch_fn(|_| {}))
        .actions(ActionSet::firestore())
        .aliases(vec![Alias::new("missing", "ghost")])
        .build();

    assert!(instance
        .skipped_methods()
        .iter()
        .all(|skip| skip.reason == SkipReason::FirestoreUnavailable));

    let err = tokio_test::block_on(instance.call("get", vec![json!("cities")])).unwrap_err();
    assert!(matches!(err, ReduxFirestoreError::FirestoreUnavailable(_)));

    let err = tokio_test::block_on(instance.call("ghost", vec![])).unwrap_err();
    assert!(matches!(err, ReduxFirestoreError::UnknownAction(_)));
}
