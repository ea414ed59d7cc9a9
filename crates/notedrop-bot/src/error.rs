//! Error types for the notedrop-bot crate.

use thiserror::Error;

/// Alias for `Result<T, BotError>`.
pub type BotResult<T> = Result<T, BotError>;

/// Errors surfaced by the bot layer.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// An environment variable named in the config has no value and no
    /// default.
    #[error("environment variable `{0}` isn't set")]
    MissingEnvVar(String),

    /// A message arrived from a user that never registered.
    #[error("unregistered user {0}, send /start to register")]
    UnregisteredUser(i64),

    /// The user selected a mode the bot does not have.
    #[error("unknown mode '{0}'")]
    UnknownMode(String),

    /// The user named a notebook that does not exist in their account.
    #[error("notebook '{0}' not found")]
    NotebookNotFound(String),

    /// The user has not completed the notes-service sign-in.
    #[error("you have to sign in to the notes service first, send /start")]
    NotSignedIn,

    /// Storage layer failure.
    #[error(transparent)]
    Store(#[from] notedrop_store::StoreError),

    /// JSON round-trip failure for a model.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
