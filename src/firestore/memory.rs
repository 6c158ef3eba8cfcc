//! In-process Firestore client
//!
//! [`MemoryFirestore`] keeps documents in a map and evaluates simple queries
//! (`where`, `orderBy`, `limit`) locally. Listeners receive the current
//! snapshot on subscription and a fresh one after every write. It also
//! records each native call, which tests use to compare call sequences.

use super::listener::{ListenerRegistration, SnapshotCallback};
use super::native::{NativeFirestore, NativeMember, NativeMethod, SetOptions};
use super::query::{Direction, QueryMeta, WhereClause, WhereOp};
use super::snapshot::{DocumentSnapshot, QuerySnapshot, Snapshot};
use crate::error::FirestoreError;
use crate::util::{compare_values, deep_merge, field_value};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::mem::discriminant;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

static NULL: Value = Value::Null;

/// In-memory [`NativeFirestore`]
#[derive(Clone, Default)]
pub struct MemoryFirestore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    documents: Mutex<BTreeMap<String, Value>>,
    watchers: Mutex<BTreeMap<u64, Watcher>>,
    next_watcher: AtomicU64,
    offline: AtomicBool,
    log_level: Mutex<String>,
    calls: Mutex<Vec<String>>,
}

struct Watcher {
    query: QueryMeta,
    callback: SnapshotCallback,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn segment_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

fn require_document_path(path: &str) -> Result<(), FirestoreError> {
    let count = segment_count(path);
    if count == 0 || count % 2 != 0 {
        return Err(FirestoreError::InvalidArgument(format!(
            "'{}' is not a document path",
            path
        )));
    }
    Ok(())
}

fn require_collection_path(path: &str) -> Result<(), FirestoreError> {
    if segment_count(path) % 2 != 1 {
        return Err(FirestoreError::InvalidArgument(format!(
            "'{}' is not a collection path",
            path
        )));
    }
    Ok(())
}

fn require_object(data: &Value) -> Result<(), FirestoreError> {
    if !data.is_object() {
        return Err(FirestoreError::InvalidArgument(
            "Document data must be an object".to_string(),
        ));
    }
    Ok(())
}

impl MemoryFirestore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `(path, data)` documents
    pub fn with_documents<I, P>(documents: I) -> Self
    where
        I: IntoIterator<Item = (P, Value)>,
        P: Into<String>,
    {
        let store = Self::new();
        {
            let mut docs = lock(&store.inner.documents);
            for (path, data) in documents {
                docs.insert(path.into(), data);
            }
        }
        store
    }

    /// Current data of a document
    pub fn document(&self, path: &str) -> Option<Value> {
        lock(&self.inner.documents).get(path).cloned()
    }

    /// Simulate losing or regaining connectivity; reads and writes fail while offline
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Whether the store is offline
    pub fn is_offline(&self) -> bool {
        self.inner.offline.load(AtomicOrdering::SeqCst)
    }

    /// Native calls made so far, e.g. `"set cities/SF"`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.inner.calls).clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        lock(&self.inner.calls).clear();
    }

    /// Number of active snapshot listeners
    pub fn listener_count(&self) -> usize {
        lock(&self.inner.watchers).len()
    }

    /// Level set through the `setLogLevel` member
    pub fn log_level(&self) -> String {
        lock(&self.inner.log_level).clone()
    }

    /// Terminate every listener on `path` with `error`, returning how many were hit
    pub fn fail_listeners(&self, path: &str, error: FirestoreError) -> usize {
        let failed: Vec<SnapshotCallback> = {
            let mut watchers = lock(&self.inner.watchers);
            let ids: Vec<u64> = watchers
                .iter()
                .filter(|(_, watcher)| watcher.query.path() == path)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| watchers.remove(id))
                .map(|watcher| watcher.callback)
                .collect()
        };
        for callback in &failed {
            callback(Err(error.clone()));
        }
        failed.len()
    }

    fn record(&self, call: String) {
        tracing::trace!(call = %call, "memory firestore call");
        lock(&self.inner.calls).push(call);
    }

    fn check_online(&self) -> Result<(), FirestoreError> {
        if self.is_offline() {
            return Err(FirestoreError::Unavailable);
        }
        Ok(())
    }

    fn evaluate(&self, query: &QueryMeta) -> Snapshot {
        let docs = lock(&self.inner.documents);
        let path = query.path();
        if query.is_document() {
            return Snapshot::Document(DocumentSnapshot::new(path.clone(), docs.get(&path).cloned()));
        }

        let prefix = format!("{}/", path);
        let mut matched: Vec<DocumentSnapshot> = docs
            .iter()
            .filter(|(doc_path, _)| {
                doc_path
                    .strip_prefix(&prefix)
                    .map(|rest| !rest.contains('/'))
                    .unwrap_or(false)
            })
            .filter(|(_, data)| query.where_clauses.iter().all(|clause| matches_clause(data, clause)))
            .map(|(doc_path, data)| DocumentSnapshot::new(doc_path.clone(), Some(data.clone())))
            .collect();

        if !query.order_by.is_empty() {
            matched.retain(|doc| {
                query
                    .order_by
                    .iter()
                    .all(|order| doc.data.as_ref().and_then(|d| field_value(d, &order.field)).is_some())
            });
            matched.sort_by(|a, b| {
                for order in &query.order_by {
                    let left = a.data.as_ref().and_then(|d| field_value(d, &order.field)).unwrap_or(&NULL);
                    let right = b.data.as_ref().and_then(|d| field_value(d, &order.field)).unwrap_or(&NULL);
                    let ordering = match order.direction {
                        Direction::Ascending => compare_values(left, right),
                        Direction::Descending => compare_values(right, left),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Snapshot::Query(QuerySnapshot::new(matched))
    }

    fn notify(&self) {
        let pending: Vec<(SnapshotCallback, Snapshot)> = {
            let watchers = lock(&self.inner.watchers);
            watchers
                .values()
                .map(|watcher| (Arc::clone(&watcher.callback), self.evaluate(&watcher.query)))
                .collect()
        };
        for (callback, snapshot) in pending {
            callback(Ok(snapshot));
        }
    }

    fn reference_method(&self, expect_document: bool) -> NativeMethod {
        NativeMethod::new(move |args: Vec<Value>| async move {
            let path = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| FirestoreError::InvalidArgument("Path must be a string".to_string()))?
                .to_string();
            if expect_document {
                require_document_path(&path)?;
            } else {
                require_collection_path(&path)?;
            }
            let id = path.rsplit('/').next().unwrap_or_default().to_string();
            Ok(json!({ "id": id, "path": path }))
        })
    }

    fn network_method(&self, offline: bool) -> NativeMethod {
        let store = self.clone();
        NativeMethod::new(move |_args: Vec<Value>| {
            let store = store.clone();
            async move {
                store.set_offline(offline);
                Ok(Value::Null)
            }
        })
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn matches_clause(data: &Value, clause: &WhereClause) -> bool {
    let Some(field) = field_value(data, &clause.field) else {
        return false;
    };
    let comparable = discriminant(field) == discriminant(&clause.value);
    match clause.op {
        WhereOp::Equal => values_equal(field, &clause.value),
        WhereOp::NotEqual => !values_equal(field, &clause.value),
        WhereOp::LessThan => comparable && compare_values(field, &clause.value) == Ordering::Less,
        WhereOp::LessThanOrEqual => {
            comparable && compare_values(field, &clause.value) != Ordering::Greater
        }
        WhereOp::GreaterThan => comparable && compare_values(field, &clause.value) == Ordering::Greater,
        WhereOp::GreaterThanOrEqual => {
            comparable && compare_values(field, &clause.value) != Ordering::Less
        }
        WhereOp::ArrayContains => field
            .as_array()
            .map(|items| items.iter().any(|item| values_equal(item, &clause.value)))
            .unwrap_or(false),
        WhereOp::In => clause
            .value
            .as_array()
            .map(|candidates| candidates.iter().any(|candidate| values_equal(field, candidate)))
            .unwrap_or(false),
    }
}

fn set_field(target: &mut Map<String, Value>, field: &str, value: Value) {
    match field.split_once('.') {
        None => {
            target.insert(field.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child_map) = child {
                set_field(child_map, rest, value);
            }
        }
    }
}

#[async_trait]
impl NativeFirestore for MemoryFirestore {
    async fn get(&self, query: &QueryMeta) -> Result<Snapshot, FirestoreError> {
        self.record(format!("get {}", query.query_name()));
        self.check_online()?;
        Ok(self.evaluate(query))
    }

    async fn set(&self, path: &str, data: Value, options: SetOptions) -> Result<(), FirestoreError> {
        self.record(format!("set {}", path));
        self.check_online()?;
        require_document_path(path)?;
        require_object(&data)?;
        {
            let mut docs = lock(&self.inner.documents);
            match docs.get_mut(path) {
                Some(existing) if options.merge => deep_merge(existing, data),
                _ => {
                    docs.insert(path.to_string(), data);
                }
            }
        }
        self.notify();
        Ok(())
    }

    async fn add(&self, collection_path: &str, data: Value) -> Result<String, FirestoreError> {
        self.record(format!("add {}", collection_path));
        self.check_online()?;
        require_collection_path(collection_path)?;
        require_object(&data)?;
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(20);
        let path = format!("{}/{}", collection_path, id);
        lock(&self.inner.documents).insert(path.clone(), data);
        self.notify();
        Ok(path)
    }

    async fn update(&self, path: &str, data: Value) -> Result<(), FirestoreError> {
        self.record(format!("update {}", path));
        self.check_online()?;
        require_document_path(path)?;
        let Value::Object(fields) = data else {
            return Err(FirestoreError::InvalidArgument(
                "Update data must be an object".to_string(),
            ));
        };
        {
            let mut docs = lock(&self.inner.documents);
            let existing = docs
                .get_mut(path)
                .ok_or_else(|| FirestoreError::NotFound(path.to_string()))?;
            if !existing.is_object() {
                *existing = Value::Object(Map::new());
            }
            if let Value::Object(target) = existing {
                for (field, value) in fields {
                    set_field(target, &field, value);
                }
            }
        }
        self.notify();
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), FirestoreError> {
        self.record(format!("delete {}", path));
        self.check_online()?;
        require_document_path(path)?;
        lock(&self.inner.documents).remove(path);
        self.notify();
        Ok(())
    }

    fn on_snapshot(
        &self,
        query: &QueryMeta,
        callback: SnapshotCallback,
    ) -> Result<ListenerRegistration, FirestoreError> {
        self.record(format!("onSnapshot {}", query.query_name()));
        let id = self.inner.next_watcher.fetch_add(1, AtomicOrdering::SeqCst);
        lock(&self.inner.watchers).insert(
            id,
            Watcher {
                query: query.clone(),
                callback: Arc::clone(&callback),
            },
        );

        callback(Ok(self.evaluate(query)));

        let weak: Weak<MemoryInner> = Arc::downgrade(&self.inner);
        Ok(ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.watchers).remove(&id);
            }
        }))
    }

    fn member(&self, name: &str) -> Option<NativeMember> {
        match name {
            "collection" => Some(NativeMember::Method(self.reference_method(false))),
            "doc" => Some(NativeMember::Method(self.reference_method(true))),
            "enableNetwork" => Some(NativeMember::Method(self.network_method(false))),
            "disableNetwork" => Some(NativeMember::Method(self.network_method(true))),
            "setLogLevel" => {
                let store = self.clone();
                Some(NativeMember::Method(NativeMethod::new(move |args: Vec<Value>| {
                    let store = store.clone();
                    async move {
                        let level = args.first().and_then(Value::as_str).unwrap_or("error");
                        *lock(&store.inner.log_level) = level.to_string();
                        Ok(Value::Null)
                    }
                })))
            }
            "settings" => Some(NativeMember::Value(json!({ "host": "memory", "ssl": false }))),
            _ => None,
        }
    }

    fn surface(&self) -> Vec<(String, NativeMember)> {
        let store = self.clone();
        vec![
            (
                "SDK_VERSION".to_string(),
                NativeMember::Value(Value::String(env!("CARGO_PKG_VERSION").to_string())),
            ),
            (
                "clearPersistence".to_string(),
                NativeMember::Method(NativeMethod::new(move |_args: Vec<Value>| {
                    let store = store.clone();
                    async move {
                        lock(&store.inner.documents).clear();
                        Ok(Value::Null)
                    }
                })),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn cities() -> MemoryFirestore {
        MemoryFirestore::with_documents(vec![
            ("cities/LA", json!({ "name": "Los Angeles", "state": "CA", "population": 3900000 })),
            ("cities/SF", json!({ "name": "San Francisco", "state": "CA", "population": 860000 })),
            ("cities/DC", json!({ "name": "Washington", "state": null, "population": 680000 })),
            ("cities/SF/landmarks/bridge", json!({ "name": "Golden Gate" })),
        ])
    }

    fn snapshot_ids(snapshot: &Snapshot) -> Vec<String> {
        match snapshot {
            Snapshot::Query(query) => query.docs.iter().map(|doc| doc.id.clone()).collect(),
            Snapshot::Document(doc) => vec![doc.id.clone()],
        }
    }

    #[tokio::test]
    async fn test_get_document() {
        let store = cities();
        let snapshot = store.get(&QueryMeta::document("cities", "SF")).await.unwrap();
        match snapshot {
            Snapshot::Document(doc) => assert_eq!(doc.get("name"), Some(&json!("San Francisco"))),
            other => panic!("expected document snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_collection_excludes_subcollections() {
        let store = cities();
        let snapshot = store.get(&QueryMeta::collection("cities")).await.unwrap();
        assert_eq!(snapshot_ids(&snapshot), vec!["DC", "LA", "SF"]);
    }

    #[tokio::test]
    async fn test_where_order_limit() {
        let store = cities();
        let query = QueryMeta::collection("cities")
            .where_clause("state", WhereOp::Equal, json!("CA"))
            .order_by("population", Direction::Descending)
            .limit(1);
        let snapshot = store.get(&query).await.unwrap();
        assert_eq!(snapshot_ids(&snapshot), vec!["LA"]);
    }

    #[tokio::test]
    async fn test_range_filter_skips_other_types() {
        let store = cities();
        let query = QueryMeta::collection("cities").where_clause("population", WhereOp::LessThan, json!(1000000));
        let snapshot = store.get(&query).await.unwrap();
        assert_eq!(snapshot_ids(&snapshot), vec!["DC", "SF"]);
    }

    #[tokio::test]
    async fn test_set_merge_and_update() {
        let store = cities();
        store
            .set("cities/SF", json!({ "mayor": { "name": "X" } }), SetOptions { merge: true })
            .await
            .unwrap();
        store.update("cities/SF", json!({ "mayor.term": 2 })).await.unwrap();
        let doc = store.document("cities/SF").unwrap();
        assert_eq!(doc["name"], json!("San Francisco"));
        assert_eq!(doc["mayor"], json!({ "name": "X", "term": 2 }));
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryFirestore::new();
        let err = store.update("cities/NOPE", json!({ "a": 1 })).await.unwrap_err();
        assert_eq!(err, FirestoreError::NotFound("cities/NOPE".to_string()));
    }

    #[tokio::test]
    async fn test_add_generates_id() {
        let store = MemoryFirestore::new();
        let path = store.add("cities", json!({ "name": "Tokyo" })).await.unwrap();
        assert!(path.starts_with("cities/"));
        assert_eq!(store.document(&path), Some(json!({ "name": "Tokyo" })));
        assert!(store.add("cities/SF", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_offline_fails_reads_and_writes() {
        let store = cities();
        store.set_offline(true);
        assert_eq!(
            store.get(&QueryMeta::collection("cities")).await.unwrap_err(),
            FirestoreError::Unavailable
        );
        assert_eq!(store.delete("cities/SF").await.unwrap_err(), FirestoreError::Unavailable);
        assert_eq!(store.calls(), vec!["get cities", "delete cities/SF"]);
    }

    #[tokio::test]
    async fn test_listener_receives_updates_until_removed() {
        let store = cities();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: SnapshotCallback = Arc::new(move |result: Result<Snapshot, FirestoreError>| {
            sink.lock().unwrap().push(result.map(|s| snapshot_ids(&s).len()));
        });
        let registration = store.on_snapshot(&QueryMeta::collection("cities"), callback).unwrap();
        store.add("cities", json!({ "name": "Tokyo" })).await.unwrap();
        registration.remove();
        store.add("cities", json!({ "name": "Osaka" })).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Ok(3), Ok(4)]);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_fail_listeners() {
        let store = cities();
        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let callback: SnapshotCallback = Arc::new(move |result: Result<Snapshot, FirestoreError>| {
            if let Err(err) = result {
                sink.lock().unwrap().push(err);
            }
        });
        let _registration = store.on_snapshot(&QueryMeta::document("cities", "SF"), callback).unwrap();
        assert_eq!(store.fail_listeners("cities/SF", FirestoreError::PermissionDenied), 1);
        assert_eq!(*errors.lock().unwrap(), vec![FirestoreError::PermissionDenied]);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_members() {
        let store = MemoryFirestore::new();
        let doc = store.member("doc").and_then(|m| m.as_method().cloned()).unwrap();
        assert_eq!(doc.call(vec![json!("cities/SF")]).await.unwrap(), json!({ "id": "SF", "path": "cities/SF" }));
        assert!(doc.call(vec![json!("cities")]).await.is_err());

        let disable = store.member("disableNetwork").and_then(|m| m.as_method().cloned()).unwrap();
        disable.call(vec![]).await.unwrap();
        assert!(store.is_offline());

        assert!(store.member("settings").unwrap().as_method().is_none());
        assert!(store.member("enablePersistence").is_none());
    }
}
