//! Query metadata
//!
//! [`QueryMeta`] describes the target of an action: a document, a collection
//! or a filtered query. Callers pass it either as a slash separated path
//! (`"cities/SF"`) or as an object:
//!
//! ```json
//! { "collection": "cities", "where": [["state", "==", "CA"]], "limit": 10 }
//! ```
//!
//! The query name derived from it keys the listener registry.

use crate::error::ReduxFirestoreError;
use crate::util::value_to_segment;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Comparison operator of a `where` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOp {
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `>=`
    GreaterThanOrEqual,
    /// `>`
    GreaterThan,
    /// `array-contains`
    ArrayContains,
    /// `in`
    In,
}

impl WhereOp {
    /// Parse an operator string
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Self::LessThan),
            "<=" => Some(Self::LessThanOrEqual),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            ">=" => Some(Self::GreaterThanOrEqual),
            ">" => Some(Self::GreaterThan),
            "array-contains" => Some(Self::ArrayContains),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    /// Operator string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThanOrEqual => ">=",
            Self::GreaterThan => ">",
            Self::ArrayContains => "array-contains",
            Self::In => "in",
        }
    }
}

impl fmt::Display for WhereOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `[field, op, value]` filter
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    /// Field path, dotted for nested fields
    pub field: String,
    /// Comparison operator
    pub op: WhereOp,
    /// Value compared against
    pub value: Value,
}

impl WhereClause {
    /// Create a filter
    pub fn new(field: impl Into<String>, op: WhereOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    fn from_value(value: &Value) -> Result<Self, ReduxFirestoreError> {
        let parts = value
            .as_array()
            .filter(|parts| parts.len() == 3)
            .ok_or_else(|| {
                ReduxFirestoreError::invalid_arguments(format!(
                    "where clause must be [field, op, value], got {}",
                    value
                ))
            })?;
        let field = parts[0]
            .as_str()
            .ok_or_else(|| ReduxFirestoreError::invalid_arguments("where field must be a string"))?;
        let op = parts[1]
            .as_str()
            .and_then(WhereOp::parse)
            .ok_or_else(|| {
                ReduxFirestoreError::invalid_arguments(format!("unsupported where operator {}", parts[1]))
            })?;
        Ok(Self::new(field, op, parts[2].clone()))
    }
}

impl Serialize for WhereClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.field)?;
        tuple.serialize_element(self.op.as_str())?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending (default)
    #[default]
    Ascending,
    /// Descending
    Descending,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// `orderBy` entry
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field path
    pub field: String,
    /// Direction
    pub direction: Direction,
}

impl OrderBy {
    fn from_value(value: &Value) -> Result<Self, ReduxFirestoreError> {
        match value {
            Value::String(field) => Ok(Self {
                field: field.clone(),
                direction: Direction::Ascending,
            }),
            Value::Array(parts) if !parts.is_empty() && parts.len() <= 2 => {
                let field = parts[0]
                    .as_str()
                    .ok_or_else(|| ReduxFirestoreError::invalid_arguments("orderBy field must be a string"))?;
                let direction = match parts.get(1).and_then(Value::as_str) {
                    None | Some("asc") => Direction::Ascending,
                    Some("desc") => Direction::Descending,
                    Some(other) => {
                        return Err(ReduxFirestoreError::invalid_arguments(format!(
                            "unsupported orderBy direction {}",
                            other
                        )))
                    }
                };
                Ok(Self {
                    field: field.to_string(),
                    direction,
                })
            }
            other => Err(ReduxFirestoreError::invalid_arguments(format!(
                "orderBy must be a field or [field, direction], got {}",
                other
            ))),
        }
    }
}

impl Serialize for OrderBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.field)?;
        tuple.serialize_element(self.direction.as_str())?;
        tuple.end()
    }
}

/// Target of a Firestore action
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
    /// Top-level collection
    pub collection: String,

    /// Document within the collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Nested collection/document pairs below `doc`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcollections: Vec<QueryMeta>,

    /// Filters
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub where_clauses: Vec<WhereClause>,

    /// Ordering
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,

    /// Maximum number of documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Explicit listener/store name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

impl QueryMeta {
    /// Query over a whole collection
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Query for a single document
    pub fn document(collection: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            doc: Some(doc.into()),
            ..Self::default()
        }
    }

    /// Add a `where` clause
    pub fn where_clause(mut self, field: impl Into<String>, op: WhereOp, value: Value) -> Self {
        self.where_clauses.push(WhereClause::new(field, op, value));
        self
    }

    /// Add an `orderBy` entry
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Set a limit
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set an explicit name
    pub fn store_as(mut self, name: impl Into<String>) -> Self {
        self.store_as = Some(name.into());
        self
    }

    /// Parse a slash separated path into collection/doc/subcollections
    pub fn from_path(path: &str) -> Result<Self, ReduxFirestoreError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(ReduxFirestoreError::invalid_arguments("Path must not be empty"));
        }

        let mut levels = segments.chunks(2).map(|pair| Self {
            collection: pair[0].to_string(),
            doc: pair.get(1).map(|doc| doc.to_string()),
            ..Self::default()
        });
        let mut meta = match levels.next() {
            Some(meta) => meta,
            None => return Err(ReduxFirestoreError::invalid_arguments("Path must not be empty")),
        };
        meta.subcollections = levels.collect();
        Ok(meta)
    }

    /// Parse a caller argument: a path string or a query object
    pub fn from_value(value: &Value) -> Result<Self, ReduxFirestoreError> {
        match value {
            Value::String(path) => Self::from_path(path),
            Value::Object(map) => Self::from_map(map),
            other => Err(ReduxFirestoreError::invalid_arguments(format!(
                "Query must be a path or an object, got {}",
                other
            ))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self, ReduxFirestoreError> {
        let collection = map
            .get("collection")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ReduxFirestoreError::invalid_arguments("Collection is required"))?;

        // a collection path like "cities/SF/landmarks" is accepted too
        let mut meta = Self::from_path(collection)?;
        if let Some(doc) = map.get("doc").and_then(Value::as_str) {
            meta.set_deepest_doc(doc);
        }

        if let Some(subcollections) = map.get("subcollections") {
            let list = subcollections
                .as_array()
                .ok_or_else(|| ReduxFirestoreError::invalid_arguments("subcollections must be an array"))?;
            for sub in list {
                meta.subcollections.push(Self::from_value(sub)?);
            }
        }

        if let Some(where_value) = map.get("where") {
            meta.where_clauses = parse_where(where_value)?;
        }
        if let Some(order_value) = map.get("orderBy") {
            meta.order_by = parse_order_by(order_value)?;
        }
        if let Some(limit) = map.get("limit") {
            let limit = limit
                .as_u64()
                .ok_or_else(|| ReduxFirestoreError::invalid_arguments("limit must be a non-negative integer"))?;
            meta.limit = Some(limit);
        }
        meta.store_as = map.get("storeAs").and_then(Value::as_str).map(str::to_string);
        Ok(meta)
    }

    fn set_deepest_doc(&mut self, doc: &str) {
        match self.subcollections.last_mut() {
            Some(last) => last.set_deepest_doc(doc),
            None => self.doc = Some(doc.to_string()),
        }
    }

    /// Path segments from the root, alternating collection and document ids
    pub fn segments(&self) -> Vec<String> {
        let mut segments = vec![self.collection.clone()];
        if let Some(doc) = &self.doc {
            segments.push(doc.clone());
        }
        for sub in &self.subcollections {
            segments.extend(sub.segments());
        }
        segments
    }

    /// Slash separated path of the target
    pub fn path(&self) -> String {
        self.segments().join("/")
    }

    /// Whether the target is a single document
    pub fn is_document(&self) -> bool {
        self.segments().len() % 2 == 0
    }

    /// Name used for the listener registry and for storing results
    ///
    /// `storeAs` when set; otherwise the path followed by any
    /// `where`, `orderBy` and `limit` parameters.
    pub fn query_name(&self) -> String {
        if let Some(name) = &self.store_as {
            return name.clone();
        }

        let mut params = Vec::new();
        if !self.where_clauses.is_empty() {
            let clauses: Vec<String> = self
                .where_clauses
                .iter()
                .map(|clause| {
                    format!(
                        "{}:{}:{}",
                        clause.field,
                        clause.op,
                        value_to_segment(&clause.value)
                    )
                })
                .collect();
            params.push(format!("where={}", clauses.join(",")));
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|order| format!("{}:{}", order.field, order.direction.as_str()))
                .collect();
            params.push(format!("orderBy={}", order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }

        let path = self.path();
        if params.is_empty() {
            path
        } else {
            format!("{}?{}", path, params.join("&"))
        }
    }
}

fn parse_where(value: &Value) -> Result<Vec<WhereClause>, ReduxFirestoreError> {
    let list = value
        .as_array()
        .ok_or_else(|| ReduxFirestoreError::invalid_arguments("where parameter must be an array"))?;
    // a single clause is [field, op, value]; several are [[...], [...]]
    if list.first().map(Value::is_string).unwrap_or(false) {
        return Ok(vec![WhereClause::from_value(value)?]);
    }
    list.iter().map(WhereClause::from_value).collect()
}

fn parse_order_by(value: &Value) -> Result<Vec<OrderBy>, ReduxFirestoreError> {
    match value {
        Value::String(_) => Ok(vec![OrderBy::from_value(value)?]),
        Value::Array(list) if list.first().map(Value::is_string).unwrap_or(false) => {
            Ok(vec![OrderBy::from_value(value)?])
        }
        Value::Array(list) => list.iter().map(OrderBy::from_value).collect(),
        other => Err(ReduxFirestoreError::invalid_arguments(format!(
            "orderBy must be a string or an array, got {}",
            other
        ))),
    }
}
