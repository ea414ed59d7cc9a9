//! The uniform CRUD contract every backend driver must satisfy identically.
//!
//! A caller holding a `dyn Store` observes the same `create` / `get` /
//! `get_all` / `save` / `delete` semantics regardless of which physical
//! backend is configured underneath. Connection discipline is standardized:
//! every driver owns one long-lived physical handle for the lifetime of the
//! store, used from one logical thread of control at a time.

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::record::Record;

/// The store facade.
///
/// All operations perform their physical I/O eagerly and surface backend
/// errors unwrapped; nothing retries. The one exception is [`Store::close`],
/// where flush failures are logged and ignored so that releasing the
/// connection is never blocked.
#[async_trait]
pub trait Store: Send + Sync {
    /// The logical collection name this store persists into.
    fn collection(&self) -> &str;

    /// Insert a record and return its id.
    ///
    /// With `auto_generate_id`, any `id` field is stripped and the backend
    /// allocates a monotonic one. Otherwise the record must carry an `id`
    /// greater than zero ([`StoreError::InvalidArgument`] if not), and the
    /// insert fails with [`StoreError::AlreadyExists`] if the id is taken.
    async fn create(&self, record: &Record, auto_generate_id: bool) -> StoreResult<i64>;

    /// Fetch all records matching `query`.
    ///
    /// The physical fetch is eager (a targeted single-row fetch when the
    /// query carries a top-level `id`); matching is applied lazily as the
    /// returned [`Records`] iterator is consumed.
    async fn get_all(&self, query: Query) -> StoreResult<Records>;

    /// Insert or update a record.
    ///
    /// A record with no `id` (or `id == 0`) is created with an
    /// auto-generated id. Otherwise the existing record with that id is
    /// updated, failing with [`StoreError::NotFound`] if it does not exist —
    /// never a silent insert.
    async fn save(&self, record: &Record) -> StoreResult<i64>;

    /// Delete the record with the given id.
    ///
    /// Fails with [`StoreError::NotFound`] when `check_deleted_count` and
    /// the physical delete affected zero rows.
    async fn delete(&self, id: i64, check_deleted_count: bool) -> StoreResult<()>;

    /// Flush any pending writes (best effort) and release the connection.
    ///
    /// Called once at process shutdown; not guaranteed safe to call twice.
    async fn close(&self) -> StoreResult<()>;

    /// Convenience wrapper over [`Store::get_all`]: the first matching
    /// record, or `None`.
    ///
    /// With `fail_if_not_exists`, no match is a [`StoreError::NotFound`].
    async fn get(&self, query: Query, fail_if_not_exists: bool) -> StoreResult<Option<Record>> {
        let key = query.to_string();
        let mut records = self.get_all(query).await?;
        match records.next() {
            Some(record) => Ok(Some(record)),
            None if fail_if_not_exists => Err(StoreError::NotFound {
                collection: self.collection().to_string(),
                key,
            }),
            None => Ok(None),
        }
    }
}

/// Lazily filtered sequence of matching records.
///
/// Finite, produced fresh by each [`Store::get_all`] call, safe to partially
/// consume, and not restartable after full consumption.
pub struct Records {
    raw: std::vec::IntoIter<Record>,
    query: Query,
}

impl Records {
    pub(crate) fn new(rows: Vec<Record>, query: Query) -> Self {
        Self {
            raw: rows.into_iter(),
            query,
        }
    }
}

impl Iterator for Records {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let query = &self.query;
        self.raw.find(|record| query.matches(record))
    }
}

/// Validate a configured collection name before it is spliced into SQL.
///
/// Collection names come from configuration, not request input, but they
/// still must be plain identifiers.
pub(crate) fn validate_collection_name(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        return Err(StoreError::InvalidArgument(format!(
            "invalid collection name `{name}`: must be [A-Za-z_][A-Za-z0-9_]*"
        )));
    }
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn records_filters_lazily() {
        let rows = vec![
            record(json!({"id": 1, "kind": "a"})),
            record(json!({"id": 2, "kind": "b"})),
            record(json!({"id": 3, "kind": "a"})),
        ];
        let mut records = Records::new(rows, Query::new().field("kind", "a"));

        assert_eq!(records.next().unwrap().id(), Some(1));
        assert_eq!(records.next().unwrap().id(), Some(3));
        assert!(records.next().is_none());
        // Not restartable after full consumption.
        assert!(records.next().is_none());
    }

    #[test]
    fn records_with_empty_query_yields_all() {
        let rows = vec![record(json!({"id": 1})), record(json!({"id": 2}))];
        let records = Records::new(rows, Query::new());
        assert_eq!(records.count(), 2);
    }

    #[test]
    fn collection_name_validation() {
        assert!(validate_collection_name("users").is_ok());
        assert!(validate_collection_name("failed_updates").is_ok());
        assert!(validate_collection_name("_private").is_ok());
        assert!(validate_collection_name("v2_data").is_ok());

        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("2fast").is_err());
        assert!(validate_collection_name("users; DROP TABLE users").is_err());
        assert!(validate_collection_name("user-data").is_err());
    }
}
