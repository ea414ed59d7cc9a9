//! Error types for the notedrop-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Uses `thiserror` for ergonomic, zero-cost error definitions.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage layer.
///
/// Driver errors (`Sqlite`, `Postgres`, `Mongo`) surface unwrapped from the
/// backend for per-operation failures; [`StoreError::Unavailable`] is reserved
/// for connect/transport failures at store construction time. No operation
/// retries — transient failures propagate to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An invalid argument was provided to a store operation
    /// (e.g. an explicit id <= 0 on `create`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Explicit-id `create` against an id that is already taken.
    #[error("record {id} already exists in `{collection}`")]
    AlreadyExists { collection: String, id: i64 },

    /// The requested record was not found.
    #[error("record not found in `{collection}`: {key}")]
    NotFound { collection: String, key: String },

    /// The physical backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Postgres operation failed.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MongoDB operation failed.
    #[error("mongo error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// BSON encoding of a record payload failed.
    #[error("bson error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
