//! The bot's storage-facing core.
//!
//! [`Bot`] owns the storage registry and the session cache for the whole
//! process: stores are opened once at startup and closed once at shutdown.
//! The webhook handler (an external collaborator) drives it: look the user
//! up, run a transition, save the user back, and on failure capture the
//! offending update for later inspection.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use notedrop_store::{Query, StorageRegistry, Store};

use crate::config::Config;
use crate::error::{BotError, BotResult};
use crate::models::{BotUser, FailedUpdate};
use crate::session::SessionCache;

/// Entity type names the registry must be configured with.
const USERS: &str = "users";
const FAILED_UPDATES: &str = "failed_updates";

/// Storage-facing bot core.
pub struct Bot {
    registry: StorageRegistry,
    users: Arc<dyn Store>,
    failed_updates: Arc<dyn Store>,
    sessions: SessionCache,
}

impl Bot {
    /// Open every configured store and build the session cache.
    pub async fn start(config: &Config) -> BotResult<Self> {
        let registry = StorageRegistry::open(&config.storage).await?;
        let users = registry.store(USERS)?;
        let failed_updates = registry.store(FAILED_UPDATES)?;
        info!(debug = config.debug, "bot storage ready");
        Ok(Self {
            registry,
            users,
            failed_updates,
            sessions: SessionCache::new(config.debug),
        })
    }

    /// The per-user notes-session cache.
    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    /// Fetch a registered user, failing with
    /// [`BotError::UnregisteredUser`] when unknown.
    #[instrument(skip(self))]
    pub async fn user(&self, user_id: i64) -> BotResult<BotUser> {
        let record = self.users.get(Query::by_id(user_id), false).await?;
        match record {
            Some(record) => BotUser::from_record(&record),
            None => Err(BotError::UnregisteredUser(user_id)),
        }
    }

    /// Find the user whose pending OAuth handshake matches `callback_key`.
    #[instrument(skip(self, callback_key))]
    pub async fn user_by_callback_key(&self, callback_key: &str) -> BotResult<Option<BotUser>> {
        let query = Query::new().field("evernote.oauth.callback_key", callback_key);
        let record = self.users.get(query, false).await?;
        record.map(|r| BotUser::from_record(&r)).transpose()
    }

    /// Persist a user, registering them on first save.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn save_user(&self, user: &BotUser) -> BotResult<()> {
        let record = user.to_record()?;
        match self.users.save(&record).await {
            Ok(_) => Ok(()),
            // First contact: the record does not exist yet.
            Err(notedrop_store::StoreError::NotFound { .. }) => {
                self.users.create(&record, false).await?;
                info!(user_id = user.id, "user registered");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Capture an update the handler could not process.
    #[instrument(skip(self, update, error))]
    pub async fn record_failed_update(
        &self,
        update: Value,
        error: &BotError,
    ) -> BotResult<i64> {
        let failed = FailedUpdate::new(update, error);
        let id = self
            .failed_updates
            .create(&failed.to_record()?, true)
            .await?;
        warn!(failed_update_id = id, error = %error, "failed update captured");
        Ok(id)
    }

    /// Close every store and drop all cached sessions. Called once at
    /// process shutdown.
    pub async fn stop(&self) {
        self.registry.close_all().await;
        self.sessions.clear();
        info!("bot stopped");
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OauthData;

    fn sqlite_test_config(dir: &tempfile::TempDir) -> Config {
        let toml = format!(
            r#"
            debug = true
            host = "localhost"

            [telegram]
            token = "123:abc"
            bot_name = "notedrop_test_bot"

            [storage.users]
            collection = "users"
            backend = "sqlite"
            dir = "{0}"
            db_name = "bot.db"

            [storage.failed_updates]
            collection = "failed_updates"
            backend = "sqlite"
            dir = "{0}"
            db_name = "bot.db"
            "#,
            dir.path().display()
        );
        Config::parse(&toml).unwrap()
    }

    #[tokio::test]
    async fn unregistered_user_lookup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bot = Bot::start(&sqlite_test_config(&dir)).await.unwrap();

        assert!(matches!(
            bot.user(8).await,
            Err(BotError::UnregisteredUser(8))
        ));
        bot.stop().await;
    }

    #[tokio::test]
    async fn save_then_fetch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let bot = Bot::start(&sqlite_test_config(&dir)).await.unwrap();

        let mut user = BotUser::new(8, 1);
        user.telegram.first_name = Some("test".to_string());
        bot.save_user(&user).await.unwrap();

        let fetched = bot.user(8).await.unwrap();
        assert_eq!(fetched, user);

        // Second save updates in place rather than re-registering.
        user.evernote.access.token = Some("token".to_string());
        bot.save_user(&user).await.unwrap();
        assert!(bot.user(8).await.unwrap().is_signed_in());

        bot.stop().await;
    }

    #[tokio::test]
    async fn callback_key_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let bot = Bot::start(&sqlite_test_config(&dir)).await.unwrap();

        let mut user = BotUser::new(8, 1);
        user.evernote.oauth = Some(OauthData {
            token: "t".to_string(),
            secret: "s".to_string(),
            callback_key: "cb-42".to_string(),
        });
        bot.save_user(&user).await.unwrap();

        let found = bot.user_by_callback_key("cb-42").await.unwrap().unwrap();
        assert_eq!(found.id, 8);
        assert!(bot.user_by_callback_key("cb-na").await.unwrap().is_none());

        bot.stop().await;
    }

    #[tokio::test]
    async fn failed_updates_are_captured() {
        let dir = tempfile::tempdir().unwrap();
        let bot = Bot::start(&sqlite_test_config(&dir)).await.unwrap();

        let update = serde_json::json!({"update_id": 1, "message": {"text": "hi"}});
        let error = BotError::UnregisteredUser(8);
        let id = bot.record_failed_update(update.clone(), &error).await.unwrap();
        assert!(id > 0);

        let stored = bot
            .failed_updates
            .get(Query::by_id(id), true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.get("update"), Some(&update));

        bot.stop().await;
    }
}
