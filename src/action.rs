//! State-update actions
//!
//! An [`Action`] is what bound methods hand to the [`Dispatch`] function:
//! a type tag plus optional `meta` (the query that triggered it) and
//! `payload`. Serialized, it has the familiar `{ "type", "meta", "payload" }`
//! shape.

use crate::constants::ACTION_PREFIX;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Function receiving every state-update action
pub type Dispatch = Arc<dyn Fn(Action) + Send + Sync>;

/// Wrap a closure as a [`Dispatch`]
pub fn dispatch_fn<F>(f: F) -> Dispatch
where
    F: Fn(Action) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Action types emitted by the standard action set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ActionType {
    Start,
    Error,
    ClearData,
    ClearError,
    SetListener,
    UnsetListener,
    ListenerResponse,
    ListenerError,
    GetRequest,
    GetSuccess,
    GetFailure,
    SetRequest,
    SetSuccess,
    SetFailure,
    AddRequest,
    AddSuccess,
    AddFailure,
    UpdateRequest,
    UpdateSuccess,
    UpdateFailure,
    DeleteRequest,
    DeleteSuccess,
    DeleteFailure,
    DocumentAdded,
    DocumentModified,
    DocumentRemoved,
}

impl ActionType {
    /// Unprefixed name, e.g. `GET_REQUEST`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Error => "ERROR",
            Self::ClearData => "CLEAR_DATA",
            Self::ClearError => "CLEAR_ERROR",
            Self::SetListener => "SET_LISTENER",
            Self::UnsetListener => "UNSET_LISTENER",
            Self::ListenerResponse => "LISTENER_RESPONSE",
            Self::ListenerError => "LISTENER_ERROR",
            Self::GetRequest => "GET_REQUEST",
            Self::GetSuccess => "GET_SUCCESS",
            Self::GetFailure => "GET_FAILURE",
            Self::SetRequest => "SET_REQUEST",
            Self::SetSuccess => "SET_SUCCESS",
            Self::SetFailure => "SET_FAILURE",
            Self::AddRequest => "ADD_REQUEST",
            Self::AddSuccess => "ADD_SUCCESS",
            Self::AddFailure => "ADD_FAILURE",
            Self::UpdateRequest => "UPDATE_REQUEST",
            Self::UpdateSuccess => "UPDATE_SUCCESS",
            Self::UpdateFailure => "UPDATE_FAILURE",
            Self::DeleteRequest => "DELETE_REQUEST",
            Self::DeleteSuccess => "DELETE_SUCCESS",
            Self::DeleteFailure => "DELETE_FAILURE",
            Self::DocumentAdded => "DOCUMENT_ADDED",
            Self::DocumentModified => "DOCUMENT_MODIFIED",
            Self::DocumentRemoved => "DOCUMENT_REMOVED",
        }
    }

    /// Fully qualified type string, e.g. `@@reduxFirestore/GET_REQUEST`
    pub fn as_string(&self) -> String {
        format!("{}/{}", ACTION_PREFIX, self.name())
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", ACTION_PREFIX, self.name())
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single state-update notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    /// Action type
    #[serde(rename = "type")]
    pub action_type: ActionType,

    /// Query metadata the action refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Action payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Action {
    /// Action with only a type
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            meta: None,
            payload: None,
        }
    }

    /// Attach query metadata
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}
