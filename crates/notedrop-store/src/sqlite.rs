//! Embedded-file backend driver over SQLite.
//!
//! One table per collection in one database file, auto-increment integer
//! key, record payload as a serialized text column. The connection is a
//! single long-lived handle behind an `Arc<Mutex<>>`; all operations
//! dispatch onto the blocking thread pool via `tokio::task::spawn_blocking`
//! so the async runtime is never blocked on file I/O.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::record::Record;
use crate::store::{validate_collection_name, Records, Store};

/// SQLite-backed store for one collection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl SqliteStore {
    /// Open (or create) the database file `db_name` under `dir` and ensure
    /// the collection's table exists.
    pub async fn open(
        dir: impl AsRef<Path>,
        db_name: &str,
        collection: &str,
    ) -> StoreResult<Self> {
        validate_collection_name(collection)?;
        let dir: PathBuf = dir.as_ref().to_path_buf();
        let db_name = db_name.to_string();
        let collection = collection.to_string();

        let conn = tokio::task::spawn_blocking(move || -> StoreResult<Connection> {
            std::fs::create_dir_all(&dir)
                .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", dir.display())))?;
            let path = dir.join(&db_name);
            info!(path = %path.display(), "opening sqlite database");
            Connection::open(&path)
                .map_err(|e| StoreError::Unavailable(format!("sqlite open failed: {e}")))
        })
        .await??;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            collection,
        };
        store.ensure_table().await?;
        Ok(store)
    }

    async fn ensure_table(&self) -> StoreResult<()> {
        let collection = self.collection.clone();
        self.execute(move |conn| {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {collection} \
                     (id INTEGER PRIMARY KEY AUTOINCREMENT, data TEXT NOT NULL)"
                ),
                [],
            )?;
            Ok(())
        })
        .await
    }

    /// Run a closure against the connection on the blocking pool.
    async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    #[instrument(skip(self, record), fields(collection = %self.collection))]
    async fn create(&self, record: &Record, auto_generate_id: bool) -> StoreResult<i64> {
        let payload = record.payload_json()?;
        let collection = self.collection.clone();

        let id = if auto_generate_id {
            self.execute(move |conn| {
                conn.execute(
                    &format!("INSERT INTO {collection} (data) VALUES (?1)"),
                    rusqlite::params![payload],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?
        } else {
            let id = record.require_explicit_id()?;
            self.execute(move |conn| {
                let sql = format!("INSERT INTO {collection} (id, data) VALUES (?1, ?2)");
                conn.execute(&sql, rusqlite::params![id, payload])
                    .map_err(|e| match e {
                        rusqlite::Error::SqliteFailure(err, _)
                            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                        {
                            StoreError::AlreadyExists { collection, id }
                        }
                        other => StoreError::Sqlite(other),
                    })?;
                Ok(id)
            })
            .await?
        };

        debug!(id, "record created");
        Ok(id)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get_all(&self, query: Query) -> StoreResult<Records> {
        let collection = self.collection.clone();
        let id_filter = query.id_filter();

        let rows = self
            .execute(move |conn| {
                let mut out: Vec<(i64, String)> = Vec::new();
                match id_filter {
                    Some(id) => {
                        let mut stmt = conn
                            .prepare(&format!("SELECT id, data FROM {collection} WHERE id = ?1"))?;
                        let mut rows = stmt.query(rusqlite::params![id])?;
                        while let Some(row) = rows.next()? {
                            out.push((row.get(0)?, row.get(1)?));
                        }
                    }
                    None => {
                        let mut stmt =
                            conn.prepare(&format!("SELECT id, data FROM {collection}"))?;
                        let mut rows = stmt.query([])?;
                        while let Some(row) = rows.next()? {
                            out.push((row.get(0)?, row.get(1)?));
                        }
                    }
                }
                Ok(out)
            })
            .await?;

        let records = rows
            .into_iter()
            .map(|(id, data)| Record::from_row(id, &data))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Records::new(records, query))
    }

    #[instrument(skip(self, record), fields(collection = %self.collection))]
    async fn save(&self, record: &Record) -> StoreResult<i64> {
        match record.id() {
            None | Some(0) => self.create(record, true).await,
            Some(id) => {
                let payload = record.payload_json()?;
                let collection = self.collection.clone();
                self.execute(move |conn| {
                    let updated = conn.execute(
                        &format!("UPDATE {collection} SET data = ?1 WHERE id = ?2"),
                        rusqlite::params![payload, id],
                    )?;
                    if updated == 0 {
                        return Err(StoreError::NotFound {
                            collection,
                            key: id.to_string(),
                        });
                    }
                    Ok(id)
                })
                .await
            }
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn delete(&self, id: i64, check_deleted_count: bool) -> StoreResult<()> {
        let collection = self.collection.clone();
        self.execute(move |conn| {
            let deleted = conn.execute(
                &format!("DELETE FROM {collection} WHERE id = ?1"),
                rusqlite::params![id],
            )?;
            if check_deleted_count && deleted != 1 {
                return Err(StoreError::NotFound {
                    collection,
                    key: id.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn close(&self) -> StoreResult<()> {
        // Writes are autocommitted; checkpoint best-effort so readers outside
        // this process see the last committed state. The handle itself is
        // released when the last Arc clone drops.
        let collection = self.collection.clone();
        self.execute(move |conn| {
            if let Err(e) = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE); PRAGMA optimize;")
            {
                warn!(collection = %collection, error = %e, "sqlite flush on close failed");
            }
            Ok(())
        })
        .await?;
        info!(collection = %self.collection, "sqlite store closed");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
