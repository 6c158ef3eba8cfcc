//! Native Firestore client seam
//!
//! [`NativeFirestore`] is the contract the extended instance composes. It is
//! implemented by a real client (or by [`MemoryFirestore`](super::MemoryFirestore)).
//! Besides the typed operations used by the action layer, a client exposes a
//! dynamic surface: [`NativeFirestore::member`] looks up a named member on the
//! live handle, which is how the allow-listed methods are copied over.

use super::listener::{ListenerRegistration, SnapshotCallback};
use super::query::QueryMeta;
use super::snapshot::Snapshot;
use crate::error::FirestoreError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a native method
pub type NativeFuture = BoxFuture<'static, Result<Value, FirestoreError>>;

/// A callable member of the native client, bound to its own handle
#[derive(Clone)]
pub struct NativeMethod {
    func: Arc<dyn Fn(Vec<Value>) -> NativeFuture + Send + Sync>,
}

impl NativeMethod {
    /// Wrap an async closure
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FirestoreError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |args| func(args).boxed()),
        }
    }

    /// Invoke with caller arguments
    pub fn call(&self, args: Vec<Value>) -> NativeFuture {
        (self.func)(args)
    }

    /// Whether two handles wrap the same function
    pub fn ptr_eq(&self, other: &NativeMethod) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeMethod")
    }
}

/// A named member of the native client
#[derive(Debug, Clone)]
pub enum NativeMember {
    /// Callable member
    Method(NativeMethod),
    /// Plain value (settings objects, constants)
    Value(Value),
}

impl NativeMember {
    /// The method, if this member is callable
    pub fn as_method(&self) -> Option<&NativeMethod> {
        match self {
            NativeMember::Method(method) => Some(method),
            NativeMember::Value(_) => None,
        }
    }

    /// The value, if this member is not callable
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            NativeMember::Method(_) => None,
            NativeMember::Value(value) => Some(value),
        }
    }
}

/// Options for `set`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into an existing document instead of replacing it
    pub merge: bool,
}

impl SetOptions {
    /// Read `{ "merge": bool }`; anything else means no merge
    pub fn from_value(value: Option<&Value>) -> Self {
        Self {
            merge: value
                .and_then(|options| options.get("merge"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

/// Native Firestore client
#[async_trait]
pub trait NativeFirestore: Send + Sync + 'static {
    /// Read a document or run a query
    async fn get(&self, query: &QueryMeta) -> Result<Snapshot, FirestoreError>;

    /// Write a document at `path`
    async fn set(&self, path: &str, data: Value, options: SetOptions) -> Result<(), FirestoreError>;

    /// Add a document with a generated id to a collection, returning its path
    async fn add(&self, collection_path: &str, data: Value) -> Result<String, FirestoreError>;

    /// Update fields of an existing document
    async fn update(&self, path: &str, data: Value) -> Result<(), FirestoreError>;

    /// Delete the document at `path`
    async fn delete(&self, path: &str) -> Result<(), FirestoreError>;

    /// Subscribe to snapshot updates for a target
    fn on_snapshot(
        &self,
        query: &QueryMeta,
        callback: SnapshotCallback,
    ) -> Result<ListenerRegistration, FirestoreError>;

    /// Look up a named member on the live client
    fn member(&self, name: &str) -> Option<NativeMember>;

    /// Top-level members of the client namespace (constants, statics)
    fn surface(&self) -> Vec<(String, NativeMember)> {
        Vec::new()
    }
}
