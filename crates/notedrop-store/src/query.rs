//! Nested-field query matching over JSON-shaped records.
//!
//! A [`Query`] maps dotted field paths (e.g. `"evernote.oauth.callback_key"`)
//! or bare field names to either a scalar to equality-match, or a nested
//! object to match recursively against the sub-object reached by descending
//! the path. All entries must match (logical AND); the empty query matches
//! every record.
//!
//! This is intentionally the full matching power of the store: no OR, no
//! ranges, no sorts, no joins, no array-membership semantics.

use std::fmt;

use serde_json::{Map, Value};

use crate::record::Record;

/// Equality and nested-equality conditions a record must satisfy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    entries: Map<String, Value>,
}

impl Query {
    /// The empty query, which matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for the record with the given id.
    pub fn by_id(id: i64) -> Self {
        let mut entries = Map::new();
        entries.insert("id".to_string(), Value::from(id));
        Self { entries }
    }

    /// Add an equality condition on a (possibly dotted) field path.
    pub fn field(mut self, path: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.entries.insert(path.into(), expected.into());
        self
    }

    /// Whether the query has no conditions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A top-level integer `id` condition, if present.
    ///
    /// Backends use this for a targeted single-row fetch instead of scanning
    /// the whole collection; any remaining conditions still go through the
    /// matcher afterwards.
    pub fn id_filter(&self) -> Option<i64> {
        self.entries.get("id").and_then(Value::as_i64)
    }

    /// Decide whether `record` satisfies every condition of this query.
    pub fn matches(&self, record: &Record) -> bool {
        object_matches(record.fields(), &self.entries)
    }
}

impl From<Value> for Query {
    /// Build a query from a JSON value; non-objects become the empty query.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(entries) => Self { entries },
            _ => Self::new(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Map serialization to a string cannot fail.
        match serde_json::to_string(&self.entries) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// Match one object against one query object, recursively.
fn object_matches(doc: &Map<String, Value>, query: &Map<String, Value>) -> bool {
    for (path, expected) in query {
        let resolved = resolve_path(doc, path);
        let matched = match expected {
            // Nested expectation: recurse against the resolved sub-object,
            // substituting an empty object when the path resolves to nothing
            // or to a non-object value.
            Value::Object(sub_query) => {
                let empty = Map::new();
                let sub_doc = resolved.and_then(Value::as_object).unwrap_or(&empty);
                object_matches(sub_doc, sub_query)
            }
            // Scalar expectation: plain equality, with "no value" treated
            // as JSON null.
            other => resolved.unwrap_or(&Value::Null) == other,
        };
        if !matched {
            return false;
        }
    }
    true
}

/// Descend `doc` one dot-separated segment at a time.
///
/// A missing segment, or an intermediate value that is not an object,
/// resolves to `None` rather than an error.
fn resolve_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// ── tests ────────────────────────────────────────────────────────────
