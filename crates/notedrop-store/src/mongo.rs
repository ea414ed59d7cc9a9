//! Document-DB backend driver over MongoDB.
//!
//! One native collection per logical collection; records are stored as
//! documents carrying an `id` field with a unique index, so no manual JSON
//! encode/decode round-trip is needed. The external contract — integer id,
//! nested dotted-query semantics, error kinds — is identical to the SQL
//! drivers. Auto-generated ids are `max(id) + 1`, which is sound under the
//! single-writer-per-process model this store is designed for.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::record::Record;
use crate::store::{validate_collection_name, Records, Store};

/// MongoDB-backed store for one collection.
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
    name: String,
}

impl MongoStore {
    /// Connect to the deployment named by `url` and ensure the unique index
    /// on `id` exists.
    pub async fn open(url: &str, db_name: &str, collection: &str) -> StoreResult<Self> {
        validate_collection_name(collection)?;
        info!(collection, db_name, "connecting to mongodb");

        let client = Client::with_uri_str(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("mongo connect failed: {e}")))?;
        let coll = client.database(db_name).collection::<Document>(collection);

        // First real I/O against the deployment; treat failure as the
        // backend being unreachable.
        let index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        coll.create_index(index)
            .await
            .map_err(|e| StoreError::Unavailable(format!("mongo index setup failed: {e}")))?;

        Ok(Self {
            client,
            collection: coll,
            name: collection.to_string(),
        })
    }

    /// Next auto-generated id: one past the current maximum.
    async fn next_id(&self) -> StoreResult<i64> {
        let top = self
            .collection
            .find_one(doc! {})
            .sort(doc! { "id": -1 })
            .await?;
        let max = top.and_then(|d| d.get_i64("id").ok()).unwrap_or(0);
        Ok(max + 1)
    }

    /// Encode a record's payload as a document carrying `id`.
    fn to_document(record: &Record, id: i64) -> StoreResult<Document> {
        let mut document =
            mongodb::bson::to_document(&Value::Object(record.payload_fields()))?;
        document.insert("id", id);
        Ok(document)
    }

    /// Decode a stored document back into a record, dropping Mongo's own
    /// `_id` so all backends yield identical records.
    fn to_record(document: Document) -> StoreResult<Record> {
        let mut value = serde_json::to_value(&document)?;
        if let Value::Object(ref mut fields) = value {
            fields.remove("_id");
        }
        Record::from_value(value)
    }

    fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
        matches!(
            &*error.kind,
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == 11000
        )
    }
}

#[async_trait]
impl Store for MongoStore {
    fn collection(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, record), fields(collection = %self.name))]
    async fn create(&self, record: &Record, auto_generate_id: bool) -> StoreResult<i64> {
        let id = if auto_generate_id {
            self.next_id().await?
        } else {
            record.require_explicit_id()?
        };

        let document = Self::to_document(record, id)?;
        self.collection.insert_one(document).await.map_err(|e| {
            if Self::is_duplicate_key(&e) {
                StoreError::AlreadyExists {
                    collection: self.name.clone(),
                    id,
                }
            } else {
                StoreError::Mongo(e)
            }
        })?;

        debug!(id, "record created");
        Ok(id)
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn get_all(&self, query: Query) -> StoreResult<Records> {
        let filter = match query.id_filter() {
            Some(id) => doc! { "id": id },
            None => doc! {},
        };

        let mut cursor = self.collection.find(filter).await?;
        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            records.push(Self::to_record(document)?);
        }
        Ok(Records::new(records, query))
    }

    #[instrument(skip(self, record), fields(collection = %self.name))]
    async fn save(&self, record: &Record) -> StoreResult<i64> {
        match record.id() {
            None | Some(0) => self.create(record, true).await,
            Some(id) => {
                let document = Self::to_document(record, id)?;
                let result = self
                    .collection
                    .replace_one(doc! { "id": id }, document)
                    .await?;
                if result.matched_count == 0 {
                    return Err(StoreError::NotFound {
                        collection: self.name.clone(),
                        key: id.to_string(),
                    });
                }
                Ok(id)
            }
        }
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    async fn delete(&self, id: i64, check_deleted_count: bool) -> StoreResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;
        if check_deleted_count && result.deleted_count != 1 {
            return Err(StoreError::NotFound {
                collection: self.name.clone(),
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        // Writes are acknowledged per operation; shut the client's
        // connection pool down gracefully.
        self.client.clone().shutdown().await;
        info!(collection = %self.name, "mongo store closed");
        Ok(())
    }
}
