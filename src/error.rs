//! redux-firestore error types
//!
//! Provides the error hierarchy for instance construction, bound method
//! invocation and the native Firestore client.
//!
//! # Design
//! Uses thiserror for ergonomic error definitions. Native client errors are
//! carried as [`FirestoreError`] and convert into [`ReduxFirestoreError`] via
//! `From`, so bound actions can propagate them with `?` unchanged.

use serde::Serialize;
use thiserror::Error;

/// Top-level redux-firestore error type
///
/// # Example
/// ```
/// use redux_firestore::{FirestoreError, ReduxFirestoreError};
///
/// let err: ReduxFirestoreError = FirestoreError::PermissionDenied.into();
/// assert!(matches!(err, ReduxFirestoreError::Firestore(FirestoreError::PermissionDenied)));
/// ```
#[derive(Debug, Error)]
pub enum ReduxFirestoreError {
    /// The singleton accessor was called before any instance was created
    #[error("Firestore instance does not yet exist. Check your compose function.")]
    InstanceNotInitialized,

    /// Errors reported by the native Firestore client
    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),

    /// The client handle has no Firestore accessor
    #[error("Firestore is not available on Firebase handle '{0}'")]
    FirestoreUnavailable(String),

    /// A bound name refers to an action that is not part of the action set
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// No member with this name on the extended instance
    #[error("No method named '{0}' on the Firestore instance")]
    MethodNotFound(String),

    /// Arguments passed to a bound method could not be interpreted
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Firestore errors
///
/// Mirrors the canonical Firestore error codes. Each variant maps to the
/// string code returned by [`FirestoreError::code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FirestoreError {
    /// Operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Permission denied
    #[error("Permission denied")]
    PermissionDenied,

    /// Resource already exists
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Resource exhausted (e.g., quota exceeded)
    #[error("Resource exhausted")]
    ResourceExhausted,

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Deadline exceeded
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Operation was aborted
    #[error("Operation aborted")]
    Aborted,

    /// Unimplemented feature
    #[error("Feature not implemented")]
    Unimplemented,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable (offline)
    #[error("Service unavailable")]
    Unavailable,

    /// Unauthenticated
    #[error("Unauthenticated")]
    Unauthenticated,
}

/// Serializable form of an error, used as the payload of failure actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Firestore string code, e.g. `permission-denied`
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl ReduxFirestoreError {
    /// Create an internal error from a string
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid arguments error from a string
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Firestore-style string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Firestore(err) => err.code(),
            Self::InvalidArguments(_) => "invalid-argument",
            Self::InstanceNotInitialized | Self::FirestoreUnavailable(_) => "failed-precondition",
            Self::UnknownAction(_) | Self::MethodNotFound(_) => "unimplemented",
            Self::Serialization(_) | Self::Internal(_) => "internal",
        }
    }

    /// Payload dispatched alongside failure actions
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl FirestoreError {
    /// Firestore string code, as reported in error payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::NotFound(_) => "not-found",
            Self::PermissionDenied => "permission-denied",
            Self::AlreadyExists(_) => "already-exists",
            Self::ResourceExhausted => "resource-exhausted",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Aborted => "aborted",
            Self::Unimplemented => "unimplemented",
            Self::Internal(_) => "internal",
            Self::Unavailable => "unavailable",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}
