//! The [`Record`] type — a JSON-shaped object with an integer id.
//!
//! Records are opaque payloads to the store: no field other than `id` is
//! ever interpreted. The JSON serialization of the non-id fields is the
//! backend's sole storage payload; the id lives in the backend's key column
//! and is re-attached on read.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// One persisted JSON-shaped object with a unique integer id within its
/// collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record (no fields, no id).
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Build a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(StoreError::InvalidArgument(format!(
                "record must be a JSON object, got: {other}"
            ))),
        }
    }

    /// Build a record from a serializable model.
    pub fn from_model<T: Serialize>(model: &T) -> StoreResult<Self> {
        Self::from_value(serde_json::to_value(model)?)
    }

    /// Deserialize the record into a typed model.
    pub fn to_model<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Reassemble a record from a backend row: payload JSON plus the key
    /// column's id.
    pub(crate) fn from_row(id: i64, payload: &str) -> StoreResult<Self> {
        let mut record = Self::from_value(serde_json::from_str(payload)?)?;
        record.set_id(id);
        Ok(record)
    }

    /// The record's `id` field as an integer, if present.
    ///
    /// `Some(0)` and `None` both mean "no id assigned yet" to [`save`];
    /// they are kept distinct here so callers can tell them apart.
    ///
    /// [`save`]: crate::Store::save
    pub fn id(&self) -> Option<i64> {
        self.fields.get("id").and_then(Value::as_i64)
    }

    /// Set the record's `id` field.
    pub fn set_id(&mut self, id: i64) {
        self.fields.insert("id".to_string(), Value::from(id));
    }

    /// Validate the id for an explicit-id `create`: it must be present
    /// and positive.
    pub(crate) fn require_explicit_id(&self) -> StoreResult<i64> {
        let id = self.id().ok_or_else(|| {
            StoreError::InvalidArgument("record has no integer `id` field".to_string())
        })?;
        if id <= 0 {
            return Err(StoreError::InvalidArgument(format!(
                "invalid id `{id}`, id must be > 0"
            )));
        }
        Ok(id)
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Insert a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// All fields, including `id` if set.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The non-id fields as a JSON object — the storage payload.
    pub(crate) fn payload_fields(&self) -> Map<String, Value> {
        let mut payload = self.fields.clone();
        payload.remove("id");
        payload
    }

    /// The storage payload serialized to a JSON string.
    pub(crate) fn payload_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string(&Value::Object(self.payload_fields()))?)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2])).is_err());
        assert!(Record::from_value(json!("text")).is_err());
        assert!(Record::from_value(json!({"a": 1})).is_ok());
    }

    #[test]
    fn id_accessors() {
        let mut record = Record::from_value(json!({"name": "test"})).unwrap();
        assert_eq!(record.id(), None);

        record.set_id(7);
        assert_eq!(record.id(), Some(7));

        let zeroed = Record::from_value(json!({"id": 0})).unwrap();
        assert_eq!(zeroed.id(), Some(0));
    }

    #[test]
    fn explicit_id_validation() {
        let no_id = Record::from_value(json!({"name": "x"})).unwrap();
        assert!(matches!(
            no_id.require_explicit_id(),
            Err(StoreError::InvalidArgument(_))
        ));

        let negative = Record::from_value(json!({"id": -1})).unwrap();
        assert!(matches!(
            negative.require_explicit_id(),
            Err(StoreError::InvalidArgument(_))
        ));

        let ok = Record::from_value(json!({"id": 3})).unwrap();
        assert_eq!(ok.require_explicit_id().unwrap(), 3);
    }

    #[test]
    fn payload_excludes_id() {
        let record = Record::from_value(json!({"id": 5, "name": "test"})).unwrap();
        let payload: Value = serde_json::from_str(&record.payload_json().unwrap()).unwrap();
        assert_eq!(payload, json!({"name": "test"}));
    }

    #[test]
    fn row_round_trip() {
        let record = Record::from_value(json!({"name": "test", "nested": {"k": 1}})).unwrap();
        let restored = Record::from_row(9, &record.payload_json().unwrap()).unwrap();
        assert_eq!(restored.id(), Some(9));
        assert_eq!(restored.get("name"), Some(&json!("test")));
        assert_eq!(restored.get("nested"), Some(&json!({"k": 1})));
    }
}
