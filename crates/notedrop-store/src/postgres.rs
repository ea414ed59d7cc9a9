//! Relational-SQL backend driver over Postgres.
//!
//! One table per collection in a shared server database, `BIGSERIAL` key,
//! record payload as a text column. One long-lived client per store
//! instance; the connection task is spawned at open and runs until the
//! client is dropped. Connections are never opened per operation.

use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::record::Record;
use crate::store::{validate_collection_name, Records, Store};

/// Postgres-backed store for one collection.
pub struct PostgresStore {
    client: Client,
    collection: String,
}

impl PostgresStore {
    /// Connect to the server named by `url` (a libpq-style connection
    /// string) and ensure the collection's table exists.
    pub async fn open(url: &str, collection: &str) -> StoreResult<Self> {
        validate_collection_name(collection)?;
        info!(collection, "connecting to postgres");

        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| StoreError::Unavailable(format!("postgres connect failed: {e}")))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "postgres connection task failed");
            }
        });

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {collection} \
             (id BIGSERIAL PRIMARY KEY, data TEXT NOT NULL)"
        );
        client.execute(sql.as_str(), &[]).await?;

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    #[instrument(skip(self, record), fields(collection = %self.collection))]
    async fn create(&self, record: &Record, auto_generate_id: bool) -> StoreResult<i64> {
        let payload = record.payload_json()?;
        let collection = &self.collection;

        let id = if auto_generate_id {
            let sql = format!("INSERT INTO {collection} (data) VALUES ($1) RETURNING id");
            let row = self.client.query_one(sql.as_str(), &[&payload]).await?;
            row.try_get::<_, i64>(0)?
        } else {
            let id = record.require_explicit_id()?;
            let sql = format!("INSERT INTO {collection} (id, data) VALUES ($1, $2)");
            self.client
                .execute(sql.as_str(), &[&id, &payload])
                .await
                .map_err(|e| {
                    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                        StoreError::AlreadyExists {
                            collection: collection.clone(),
                            id,
                        }
                    } else {
                        StoreError::Postgres(e)
                    }
                })?;
            id
        };

        debug!(id, "record created");
        Ok(id)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get_all(&self, query: Query) -> StoreResult<Records> {
        let collection = &self.collection;
        let rows = match query.id_filter() {
            Some(id) => {
                let sql = format!("SELECT id, data FROM {collection} WHERE id = $1");
                self.client.query(sql.as_str(), &[&id]).await?
            }
            None => {
                let sql = format!("SELECT id, data FROM {collection}");
                self.client.query(sql.as_str(), &[]).await?
            }
        };

        let records = rows
            .into_iter()
            .map(|row| {
                let id: i64 = row.try_get(0)?;
                let data: String = row.try_get(1)?;
                Record::from_row(id, &data)
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Records::new(records, query))
    }

    #[instrument(skip(self, record), fields(collection = %self.collection))]
    async fn save(&self, record: &Record) -> StoreResult<i64> {
        match record.id() {
            None | Some(0) => self.create(record, true).await,
            Some(id) => {
                let payload = record.payload_json()?;
                let sql = format!("UPDATE {} SET data = $1 WHERE id = $2", self.collection);
                let updated = self.client.execute(sql.as_str(), &[&payload, &id]).await?;
                if updated == 0 {
                    return Err(StoreError::NotFound {
                        collection: self.collection.clone(),
                        key: id.to_string(),
                    });
                }
                Ok(id)
            }
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn delete(&self, id: i64, check_deleted_count: bool) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.collection);
        let deleted = self.client.execute(sql.as_str(), &[&id]).await?;
        if check_deleted_count && deleted != 1 {
            return Err(StoreError::NotFound {
                collection: self.collection.clone(),
                key: id.to_string(),
            });
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        // Autocommit: nothing pending to flush. The client and its
        // connection task shut down when the store is dropped.
        info!(collection = %self.collection, "postgres store closed");
        Ok(())
    }
}
