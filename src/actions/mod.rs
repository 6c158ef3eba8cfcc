//! Action definitions
//!
//! An [`ActionDefinition`] performs a Firestore call on behalf of a bound
//! method and reports its progress through the dispatch function. The
//! standard set ([`ActionSet::firestore`]) covers reads, writes and
//! listeners; callers may supply their own set instead.

mod documents;
mod listeners;

use crate::action::{Action, ActionType, Dispatch};
use crate::app::FirebaseHandle;
use crate::error::ReduxFirestoreError;
use crate::firestore::{NativeFirestore, QueryMeta};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub use documents::{Add, DeleteRef, Get, Set, Update};
pub use listeners::{SetListener, SetListeners, UnsetListener, UnsetListeners};

/// A named remote operation that emits state-update actions
#[async_trait]
pub trait ActionDefinition: Send + Sync {
    /// Run the action against `firebase`, dispatching progress through `dispatch`
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError>;
}

/// Adapter turning an async closure into an [`ActionDefinition`]
pub struct ActionFn<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> ActionDefinition for ActionFn<F>
where
    F: Fn(FirebaseHandle, Dispatch, Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ReduxFirestoreError>> + Send + 'static,
{
    async fn run(
        &self,
        firebase: &FirebaseHandle,
        dispatch: &Dispatch,
        args: Vec<Value>,
    ) -> Result<Value, ReduxFirestoreError> {
        (self.func)(firebase.clone(), Arc::clone(dispatch), args).await
    }
}

/// Wrap an async closure as an action
///
/// # Example
/// ```
/// use redux_firestore::actions::{action_fn, ActionSet};
/// use redux_firestore::ReduxFirestoreError;
/// use serde_json::Value;
///
/// let actions = ActionSet::new().with(
///     "ping",
///     action_fn(|_firebase, _dispatch, _args| async {
///         Ok::<_, ReduxFirestoreError>(Value::from("pong"))
///     }),
/// );
/// assert!(actions.get("ping").is_some());
/// ```
pub fn action_fn<F, Fut>(func: F) -> Arc<dyn ActionDefinition>
where
    F: Fn(FirebaseHandle, Dispatch, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ReduxFirestoreError>> + Send + 'static,
{
    Arc::new(ActionFn { func })
}

/// Action name → definition
#[derive(Clone, Default)]
pub struct ActionSet {
    actions: BTreeMap<String, Arc<dyn ActionDefinition>>,
}

impl ActionSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard Firestore actions
    pub fn firestore() -> Self {
        Self::new()
            .with("get", Arc::new(Get))
            .with("set", Arc::new(Set))
            .with("add", Arc::new(Add))
            .with("update", Arc::new(Update))
            .with("deleteRef", Arc::new(DeleteRef))
            .with("setListener", Arc::new(SetListener))
            .with("setListeners", Arc::new(SetListeners))
            .with("unsetListener", Arc::new(UnsetListener))
            .with("unsetListeners", Arc::new(UnsetListeners))
    }

    /// Add or replace an action
    pub fn with(mut self, name: impl Into<String>, action: Arc<dyn ActionDefinition>) -> Self {
        self.insert(name, action);
        self
    }

    /// Add or replace an action in place
    pub fn insert(&mut self, name: impl Into<String>, action: Arc<dyn ActionDefinition>) {
        self.actions.insert(name.into(), action);
    }

    /// Look up an action
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ActionDefinition>> {
        self.actions.get(name)
    }

    /// Action names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    /// Iterate over `(name, action)`
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn ActionDefinition>)> {
        self.actions.iter()
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.actions.keys()).finish()
    }
}

/// Request/success/failure action types of a wrapped call
#[derive(Debug, Clone, Copy)]
pub(crate) struct DispatchTypes {
    pub request: ActionType,
    pub success: ActionType,
    pub failure: ActionType,
}

/// Dispatch `request`, await `call`, then dispatch `success` or `failure`.
///
/// Errors are returned unchanged after the failure action went out.
pub(crate) async fn wrap_in_dispatch<Fut>(
    dispatch: &Dispatch,
    types: DispatchTypes,
    meta: &QueryMeta,
    args: Value,
    call: Fut,
) -> Result<Value, ReduxFirestoreError>
where
    Fut: Future<Output = Result<Value, ReduxFirestoreError>>,
{
    let meta = serde_json::to_value(meta)?;
    dispatch(Action::new(types.request).with_meta(meta.clone()).with_payload(args));

    match call.await {
        Ok(result) => {
            dispatch(
                Action::new(types.success)
                    .with_meta(meta)
                    .with_payload(result.clone()),
            );
            Ok(result)
        }
        Err(err) => {
            tracing::debug!(action = %types.failure, error = %err, "Firestore call failed");
            dispatch(
                Action::new(types.failure)
                    .with_meta(meta)
                    .with_payload(serde_json::to_value(err.to_payload())?),
            );
            Err(err)
        }
    }
}

/// The handle's native client, or a runtime error when it has none
pub(crate) fn native(firebase: &FirebaseHandle) -> Result<Arc<dyn NativeFirestore>, ReduxFirestoreError> {
    firebase
        .firestore()
        .ok_or_else(|| ReduxFirestoreError::FirestoreUnavailable(firebase.name().to_string()))
}

/// Query argument at `index`
pub(crate) fn query_arg(args: &[Value], index: usize) -> Result<QueryMeta, ReduxFirestoreError> {
    let value = args.get(index).ok_or_else(|| {
        ReduxFirestoreError::invalid_arguments(format!("missing query argument at position {}", index))
    })?;
    QueryMeta::from_value(value)
}

/// Document data argument at `index`
pub(crate) fn data_arg(args: &[Value], index: usize) -> Result<Value, ReduxFirestoreError> {
    match args.get(index) {
        Some(data @ Value::Object(_)) => Ok(data.clone()),
        Some(other) => Err(ReduxFirestoreError::invalid_arguments(format!(
            "document data must be an object, got {}",
            other
        ))),
        None => Err(ReduxFirestoreError::invalid_arguments(format!(
            "missing document data at position {}",
            index
        ))),
    }
}

/// List of queries at `index`: an array of queries or a single query
pub(crate) fn query_list_arg(args: &[Value], index: usize) -> Result<Vec<QueryMeta>, ReduxFirestoreError> {
    match args.get(index) {
        Some(Value::Array(list)) => list.iter().map(QueryMeta::from_value).collect(),
        Some(single) => Ok(vec![QueryMeta::from_value(single)?]),
        None => Ok(Vec::new()),
    }
}
