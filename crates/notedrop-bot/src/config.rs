//! Configuration loading.
//!
//! The config file is TOML with `${ENV_VAR}` placeholders interpolated from
//! the process environment before parsing. A small set of variables has
//! built-in defaults; any other unset variable is a startup error — the bot
//! refuses to run half-configured.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use notedrop_store::CollectionConfig;

use crate::error::{BotError, BotResult};

/// Telegram-side settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TelegramConfig {
    pub token: String,
    pub bot_name: String,
}

/// Top-level bot configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,
    pub host: String,
    pub telegram: TelegramConfig,
    /// One storage section per logical entity type (`users`,
    /// `failed_updates`).
    pub storage: HashMap<String, CollectionConfig>,
}

impl Config {
    /// Read and interpolate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> BotResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::parse(&raw)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse config text after `${ENV_VAR}` interpolation.
    pub fn parse(raw: &str) -> BotResult<Self> {
        let interpolated = interpolate_env(raw, |name| std::env::var(name).ok())?;
        toml::from_str(&interpolated).map_err(|e| BotError::Config(e.to_string()))
    }
}

/// Defaults for variables commonly left unset in development.
fn default_for(name: &str) -> Option<&'static str> {
    match name {
        "MONGO_HOST" => Some("127.0.0.1"),
        "NOTEDROP_DEBUG" => Some("false"),
        "NOTEDROP_HOSTNAME" => Some("localhost"),
        _ => None,
    }
}

/// Replace every `${NAME}` with the variable's value, its built-in default,
/// or fail with [`BotError::MissingEnvVar`].
fn interpolate_env(
    raw: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> BotResult<String> {
    // The pattern is a fixed literal; compilation cannot fail.
    let placeholder = match Regex::new(r"\$\{([0-9A-Za-z_]+)\}") {
        Ok(re) => re,
        Err(e) => return Err(BotError::Config(format!("bad placeholder pattern: {e}"))),
    };

    let mut result = String::with_capacity(raw.len());
    let mut last = 0;
    for caps in placeholder.captures_iter(raw) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let name = &caps[1];
        let value = lookup(name)
            .or_else(|| default_for(name).map(str::to_string))
            .ok_or_else(|| BotError::MissingEnvVar(name.to_string()))?;
        result.push_str(&raw[last..whole.0]);
        result.push_str(&value);
        last = whole.1;
    }
    result.push_str(&raw[last..]);
    Ok(result)
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use notedrop_store::BackendConfig;

    const SAMPLE: &str = r#"
        debug = false
        host = "bot.example.org"

        [telegram]
        token = "123:abc"
        bot_name = "notedrop_bot"

        [storage.users]
        collection = "users"
        backend = "sqlite"
        dir = "/var/lib/notedrop"
        db_name = "bot.db"

        [storage.failed_updates]
        collection = "failed_updates"
        backend = "mongo"
        url = "mongodb://${MONGO_HOST}:27017"
        db_name = "notedrop"
    "#;

    #[test]
    fn parses_full_config_with_default_interpolation() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.telegram.bot_name, "notedrop_bot");
        assert_eq!(config.storage.len(), 2);

        let users = &config.storage["users"];
        assert_eq!(users.collection, "users");
        assert!(matches!(users.backend, BackendConfig::Sqlite { .. }));

        // ${MONGO_HOST} falls back to its built-in default.
        match &config.storage["failed_updates"].backend {
            BackendConfig::Mongo { url, .. } => {
                assert_eq!(url, "mongodb://127.0.0.1:27017");
            }
            other => panic!("expected mongo backend, got {other:?}"),
        }
    }

    #[test]
    fn interpolation_prefers_provided_values() {
        let out = interpolate_env("host = \"${MY_HOST}\"", |name| {
            (name == "MY_HOST").then(|| "example.net".to_string())
        })
        .unwrap();
        assert_eq!(out, "host = \"example.net\"");
    }

    #[test]
    fn missing_variable_without_default_is_an_error() {
        let result = interpolate_env("token = \"${NO_SUCH_VARIABLE_SET}\"", |_| None);
        assert!(matches!(
            result,
            Err(BotError::MissingEnvVar(name)) if name == "NO_SUCH_VARIABLE_SET"
        ));
    }

    #[test]
    fn multiple_placeholders_in_one_line() {
        let out = interpolate_env("url = \"${A}:${B}\"", |name| match name {
            "A" => Some("left".to_string()),
            "B" => Some("right".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(out, "url = \"left:right\"");
    }

    #[test]
    fn unknown_backend_in_storage_section_fails() {
        let result = Config::parse(
            r#"
            host = "x"
            [telegram]
            token = "t"
            bot_name = "b"
            [storage.users]
            collection = "users"
            backend = "dynamodb"
            "#,
        );
        assert!(matches!(result, Err(BotError::Config(_))));
    }
}
