//! Document reads and writes

use super::{data_arg, native, query_arg, wrap_in_dispatch, ActionDefinition, DispatchTypes};
use crate::action::{ActionType, Dispatch};
use crate::app::FirebaseHandle;
use crate::error::ReduxFirestoreError;
use crate::firestore::{QueryMeta, SetOptions};
use async_trait::async_trait;
use serde_json::{json, Value};

const GET: DispatchTypes = DispatchTypes {
    request: ActionType::GetRequest,
    success: ActionType::GetSuccess,
    failure: ActionType::GetFailure,
};

const SET: DispatchTypes = DispatchTypes {
    request: ActionType::SetRequest,
    success: ActionType::SetSuccess,
    failure: ActionType::SetFailure,
};

const ADD: DispatchTypes = DispatchTypes {
    request: ActionType::AddRequest,
    success: ActionType::AddSuccess,
    failure: ActionType::AddFailure,
};

const UPDATE: DispatchTypes = DispatchTypes {
    request: ActionType::UpdateRequest,
    success: ActionType::UpdateSuccess,
    failure: ActionType::UpdateFailure,
};

const DELETE: DispatchTypes = DispatchTypes {
    request: ActionType::DeleteRequest,
    success: ActionType::DeleteSuccess,
    failure: ActionType::DeleteFailure,
};

fn require_document(meta: &QueryMeta, action: &str) -> Result<(), ReduxFirestoreError> {
    if !meta.is_document() {
        return Err(ReduxFirestoreError::invalid_arguments(format!(
            "{} requires a document, got '{}'",
            action,
            meta.path()
        )));
    }
    Ok(())
}

/// `get(query)`: read a document or run a query
///
/// Succeeds with the `{ data, ordered }` payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Get;

#[async_trait]
impl ActionDefinition for Get {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let meta = query_arg(&args, 0)?;
        let native = native(firebase)?;
        wrap_in_dispatch(dispatch, GET, &meta, Value::Array(args), async {
            let snapshot = native.get(&meta).await?;
            Ok(snapshot.to_payload())
        })
        .await
    }
}

/// `set(doc, data, { merge }?)`: write a document
#[derive(Debug, Clone, Copy, Default)]
pub struct Set;

#[async_trait]
impl ActionDefinition for Set {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let meta = query_arg(&args, 0)?;
        require_document(&meta, "set")?;
        let data = data_arg(&args, 1)?;
        let options = SetOptions::from_value(args.get(2));
        let native = native(firebase)?;
        wrap_in_dispatch(dispatch, SET, &meta, Value::Array(args), async {
            native.set(&meta.path(), data, options).await?;
            Ok(Value::Null)
        })
        .await
    }
}

/// `add(collection, data)`: create a document with a generated id
///
/// Succeeds with `{ id, path }` of the new document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

#[async_trait]
impl ActionDefinition for Add {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let meta = query_arg(&args, 0)?;
        if meta.is_document() {
            return Err(ReduxFirestoreError::invalid_arguments(format!(
                "add requires a collection, got '{}'",
                meta.path()
            )));
        }
        let data = data_arg(&args, 1)?;
        let native = native(firebase)?;
        wrap_in_dispatch(dispatch, ADD, &meta, Value::Array(args), async {
            let path = native.add(&meta.path(), data).await?;
            let id = path.rsplit('/').next().unwrap_or_default().to_string();
            Ok(json!({ "id": id, "path": path }))
        })
        .await
    }
}

/// `update(doc, data)`: update fields of an existing document
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

#[async_trait]
impl ActionDefinition for Update {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let meta = query_arg(&args, 0)?;
        require_document(&meta, "update")?;
        let data = data_arg(&args, 1)?;
        let native = native(firebase)?;
        wrap_in_dispatch(dispatch, UPDATE, &meta, Value::Array(args), async {
            native.update(&meta.path(), data).await?;
            Ok(Value::Null)
        })
        .await
    }
}

/// `deleteRef(doc)`: delete a document; collections cannot be deleted
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteRef;

#[async_trait]
impl ActionDefinition for DeleteRef {
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        let meta = query_arg(&args, 0)?;
        if !meta.is_document() {
            return Err(ReduxFirestoreError::invalid_arguments(
                "Only documents can be deleted",
            ));
        }
        let native = native(firebase)?;
        wrap_in_dispatch(dispatch, DELETE, &meta, Value::Array(args), async {
            native.delete(&meta.path()).await?;
            Ok(Value::Null)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{dispatch_fn, Action};
    use crate::error::FirestoreError;
    use crate::firestore::MemoryFirestore;
    use std::sync::{Arc, Mutex};

    struct Fixture {
        store: MemoryFirestore,
        firebase: FirebaseHandle,
        dispatch: Dispatch,
        seen: Arc<Mutex<Vec<Action>>>,
    }

    fn fixture() -> Fixture {
        let store = MemoryFirestore::with_documents(vec![(
            "cities/SF",
            json!({ "name": "San Francisco", "state": "CA" }),
        )]);
        let firebase = FirebaseHandle::with_firestore(store.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let dispatch = dispatch_fn(move |action| sink.lock().unwrap().push(action));
        Fixture {
            store,
            firebase,
            dispatch,
            seen,
        }
    }

    fn types(seen: &Arc<Mutex<Vec<Action>>>) -> Vec<ActionType> {
        seen.lock().unwrap().iter().map(|a| a.action_type).collect()
    }

    #[tokio::test]
    async fn test_get_dispatches_request_and_success() {
        let f = fixture();
        let result = Get
            .run(&f.firebase, &f.dispatch, vec![json!("cities/SF")])
            .await
            .unwrap();
        assert_eq!(result["data"]["SF"]["name"], json!("San Francisco"));
        assert_eq!(types(&f.seen), vec![ActionType::GetRequest, ActionType::GetSuccess]);
    }

    #[tokio::test]
    async fn test_set_and_update() {
        let f = fixture();
        Set.run(
            &f.firebase,
            &f.dispatch,
            vec![json!({ "collection": "cities", "doc": "LA" }), json!({ "name": "LA" })],
        )
        .await
        .unwrap();
        Update
            .run(&f.firebase, &f.dispatch, vec![json!("cities/LA"), json!({ "state": "CA" })])
            .await
            .unwrap();
        assert_eq!(f.store.document("cities/LA"), Some(json!({ "name": "LA", "state": "CA" })));
        assert_eq!(
            types(&f.seen),
            vec![
                ActionType::SetRequest,
                ActionType::SetSuccess,
                ActionType::UpdateRequest,
                ActionType::UpdateSuccess
            ]
        );
    }

    #[tokio::test]
    async fn test_add_returns_id() {
        let f = fixture();
        let result = Add
            .run(&f.firebase, &f.dispatch, vec![json!("cities"), json!({ "name": "Tokyo" })])
            .await
            .unwrap();
        let path = result["path"].as_str().unwrap().to_string();
        assert_eq!(f.store.document(&path), Some(json!({ "name": "Tokyo" })));
        assert!(path.ends_with(result["id"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn test_delete_ref_rejects_collections() {
        let f = fixture();
        let err = DeleteRef
            .run(&f.firebase, &f.dispatch, vec![json!("cities")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReduxFirestoreError::InvalidArguments(_)));
        assert!(types(&f.seen).is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_dispatched_and_propagated() {
        let f = fixture();
        f.store.set_offline(true);
        let err = DeleteRef
            .run(&f.firebase, &f.dispatch, vec![json!("cities/SF")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReduxFirestoreError::Firestore(FirestoreError::Unavailable)));
        assert_eq!(types(&f.seen), vec![ActionType::DeleteRequest, ActionType::DeleteFailure]);
    }

    #[tokio::test]
    async fn test_missing_firestore() {
        let f = fixture();
        let firebase = FirebaseHandle::without_firestore("bare");
        let err = Get
            .run(&firebase, &f.dispatch, vec![json!("cities")])
            .await
            .unwrap_err();
        assert!(matches!(err, ReduxFirestoreError::FirestoreUnavailable(_)));
    }
}
