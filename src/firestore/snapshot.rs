//! Document and query snapshots
//!
//! Snapshots returned by the native client, plus the conversion into the
//! `{ data, ordered }` payload carried by success and listener actions.

use serde::Serialize;
use serde_json::{Map, Value};

/// Metadata about a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Whether the snapshot contains pending writes
    pub has_pending_writes: bool,

    /// Whether the data came from cache
    pub from_cache: bool,
}

/// Firestore document snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSnapshot {
    /// Document id (last path segment)
    pub id: String,

    /// Full document path (e.g., "users/alice")
    pub path: String,

    /// Document data (None if document doesn't exist)
    pub data: Option<Value>,

    /// Snapshot metadata
    pub metadata: SnapshotMetadata,
}

impl DocumentSnapshot {
    /// Snapshot for `path`, existing when `data` is `Some`
    pub fn new(path: impl Into<String>, data: Option<Value>) -> Self {
        let path = path.into();
        let id = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            id,
            path,
            data,
            metadata: SnapshotMetadata::default(),
        }
    }

    /// Check if document exists
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Get a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        let Some(data) = &self.data else {
            return None;
        };
        data.get(field)
    }

    /// Document data with its id merged in, as stored in ordered results
    pub fn with_id(&self) -> Option<Value> {
        let data = self.data.as_ref()?;
        let mut map = match data {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Some(Value::Object(map))
    }
}

/// Query snapshot containing multiple documents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuerySnapshot {
    /// Matching documents, in query order
    pub docs: Vec<DocumentSnapshot>,

    /// Snapshot metadata
    pub metadata: SnapshotMetadata,
}

impl QuerySnapshot {
    /// Snapshot over the given documents
    pub fn new(docs: Vec<DocumentSnapshot>) -> Self {
        Self {
            docs,
            metadata: SnapshotMetadata::default(),
        }
    }

    /// Check if the query result is empty
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Get the number of documents in the snapshot
    pub fn len(&self) -> usize {
        self.docs.len()
    }
}

/// Result of reading or listening to a target
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// A single document target
    Document(DocumentSnapshot),
    /// A collection or query target
    Query(QuerySnapshot),
}

impl Snapshot {
    /// `{ data, ordered }` payload
    ///
    /// `data` maps document id to document data (`null` for a missing
    /// document). `ordered` lists documents in query order with their id.
    pub fn to_payload(&self) -> Value {
        let docs: Vec<&DocumentSnapshot> = match self {
            Snapshot::Document(doc) => vec![doc],
            Snapshot::Query(query) => query.docs.iter().collect(),
        };

        let mut data = Map::new();
        let mut ordered = Vec::new();
        for doc in docs {
            data.insert(doc.id.clone(), doc.data.clone().unwrap_or(Value::Null));
            if let Some(entry) = doc.with_id() {
                ordered.push(entry);
            }
        }

        let mut payload = Map::new();
        payload.insert("data".to_string(), Value::Object(data));
        payload.insert("ordered".to_string(), Value::Array(ordered));
        Value::Object(payload)
    }

    /// Metadata of the snapshot
    pub fn metadata(&self) -> SnapshotMetadata {
        match self {
            Snapshot::Document(doc) => doc.metadata,
            Snapshot::Query(query) => query.metadata,
        }
    }
}
