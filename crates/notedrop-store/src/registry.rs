//! Process-wide mapping from logical entity types to configured stores.
//!
//! Configuration enumerates, per entity type (e.g. `users`,
//! `failed_updates`), which backend to instantiate and its connection
//! parameters. Every store is constructed once at startup and held for the
//! lifetime of the process; [`StorageRegistry::close_all`] is invoked during
//! shutdown. There is no lazy re-creation mid-process.
//!
//! Backend selection is a typed enum rather than a class-path lookup, so an
//! unknown backend name fails when the configuration is deserialized,
//! never as a late runtime failure.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::mongo::MongoStore;
use crate::postgres::PostgresStore;
use crate::sqlite::SqliteStore;
use crate::store::Store;

/// Which driver to instantiate, with its connection parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Embedded-file backend: one database file under `dir`.
    Sqlite { dir: PathBuf, db_name: String },
    /// Relational-SQL backend: libpq-style connection string.
    Postgres { url: String },
    /// Document-DB backend: connection string plus database name.
    Mongo { url: String, db_name: String },
}

/// Storage configuration for one logical entity type.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CollectionConfig {
    /// Physical collection/table name.
    pub collection: String,
    /// Backend driver and connection parameters.
    #[serde(flatten)]
    pub backend: BackendConfig,
}

/// Construct the store described by `config`.
pub async fn build_store(config: &CollectionConfig) -> StoreResult<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match &config.backend {
        BackendConfig::Sqlite { dir, db_name } => {
            Arc::new(SqliteStore::open(dir, db_name, &config.collection).await?)
        }
        BackendConfig::Postgres { url } => {
            Arc::new(PostgresStore::open(url, &config.collection).await?)
        }
        BackendConfig::Mongo { url, db_name } => {
            Arc::new(MongoStore::open(url, db_name, &config.collection).await?)
        }
    };
    Ok(store)
}

/// Registry of one store per logical entity type.
pub struct StorageRegistry {
    stores: HashMap<String, Arc<dyn Store>>,
}

impl StorageRegistry {
    /// Open every configured store. Fails fast if any backend is
    /// unreachable — a half-initialized registry is never returned.
    pub async fn open(configs: &HashMap<String, CollectionConfig>) -> StoreResult<Self> {
        let mut stores = HashMap::with_capacity(configs.len());
        for (entity, config) in configs {
            let store = build_store(config).await?;
            info!(entity, collection = %config.collection, "store opened");
            stores.insert(entity.clone(), store);
        }
        Ok(Self { stores })
    }

    /// The store bound to an entity type.
    pub fn store(&self, entity: &str) -> StoreResult<Arc<dyn Store>> {
        self.stores.get(entity).cloned().ok_or_else(|| {
            StoreError::InvalidArgument(format!("no store configured for entity `{entity}`"))
        })
    }

    /// Entity types with a configured store.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    /// Close every registered store. Close failures are logged, not
    /// propagated — shutdown proceeds regardless.
    pub async fn close_all(&self) {
        for (entity, store) in &self.stores {
            if let Err(e) = store.close().await {
                warn!(entity, error = %e, "store close failed");
            }
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
