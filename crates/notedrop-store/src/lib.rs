//! # notedrop-store
//!
//! Document storage for notedrop.
//!
//! Provides a uniform CRUD contract over JSON-shaped records with
//! interchangeable physical backends, plus an in-memory nested-field query
//! matcher for filtering by dotted paths (e.g.
//! `"evernote.oauth.callback_key"`).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  StorageRegistry (entity type → Store)        │
//! ├──────────────────────────────────────────────┤
//! │  Store trait (create/get/get_all/save/        │
//! │               delete/close)                   │
//! │  Query matcher (dotted paths, nested objects) │
//! ├──────────────┬──────────────┬────────────────┤
//! │  SqliteStore │ PostgresStore│  MongoStore     │
//! │  (rusqlite)  │ (tokio-pg)   │  (mongodb)      │
//! └──────────────┴──────────────┴────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use notedrop_store::{Query, Record, SqliteStore, Store};
//!
//! let store = SqliteStore::open("data", "notedrop.db", "users").await?;
//! let mut user = Record::from_value(serde_json::json!({"name": "alice"}))?;
//! let id = store.create(&user, true).await?;
//! let found = store.get(Query::by_id(id), false).await?;
//! store.close().await?;
//! ```

pub mod error;
pub mod mongo;
pub mod postgres;
pub mod query;
pub mod record;
pub mod registry;
pub mod sqlite;
pub mod store;

// ── re-exports ───────────────────────────────────────────────────────

pub use error::{StoreError, StoreResult};
pub use mongo::MongoStore;
pub use postgres::PostgresStore;
pub use query::Query;
pub use record::Record;
pub use registry::{build_store, BackendConfig, CollectionConfig, StorageRegistry};
pub use sqlite::SqliteStore;
pub use store::{Records, Store};
