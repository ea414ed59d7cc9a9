//! Per-user notes-service session cache.
//!
//! Building a notes-service client requires the user's access token, so the
//! bot keeps one session per user id for the whole process run: populated
//! on first use, never invalidated within a run, cleared once at shutdown.
//! This is deliberate process-wide state with an explicit lifecycle, not an
//! ad-hoc mutable global.

use std::sync::Arc;

use moka::future::Cache;
use tracing::debug;

use crate::error::{BotError, BotResult};
use crate::models::BotUser;

/// Everything needed to talk to the notes service on behalf of one user.
///
/// The actual API transport lives outside this crate; collaborators read
/// the token and sandbox flag from here.
#[derive(Debug, Clone, PartialEq)]
pub struct NotesSession {
    pub user_id: i64,
    pub access_token: String,
    pub sandbox: bool,
}

/// Process-wide cache of [`NotesSession`]s keyed by user id.
#[derive(Clone)]
pub struct SessionCache {
    inner: Cache<i64, Arc<NotesSession>>,
    sandbox: bool,
}

impl SessionCache {
    /// Create the cache. `sandbox` is the debug-mode flag from config and
    /// applies to every session built for this run.
    pub fn new(sandbox: bool) -> Self {
        Self {
            // Sized for the realistic number of concurrently active users;
            // entries live for the whole run regardless.
            inner: Cache::new(10_000),
            sandbox,
        }
    }

    /// The session for `user`, built on first use.
    ///
    /// Fails with [`BotError::NotSignedIn`] when the user has no access
    /// token yet.
    pub async fn session(&self, user: &BotUser) -> BotResult<Arc<NotesSession>> {
        let token = user
            .evernote
            .access
            .token
            .clone()
            .ok_or(BotError::NotSignedIn)?;
        let sandbox = self.sandbox;
        let user_id = user.id;
        let session = self
            .inner
            .get_with(user_id, async move {
                debug!(user_id, "building notes session");
                Arc::new(NotesSession {
                    user_id,
                    access_token: token,
                    sandbox,
                })
            })
            .await;
        Ok(session)
    }

    /// Number of cached sessions.
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session. Called once from the shutdown path.
    pub fn clear(&self) {
        self.inner.invalidate_all();
        debug!("session cache cleared");
    }
}

// ── tests ────────────────────────────────────────────────────────────
