//! Bot user model and the record round-trip.
//!
//! A [`BotUser`] is what the storage layer persists per chat user: telegram
//! identity, notes-service access data, the destination notebook, the bot
//! mode, and the pending conversation state, if any.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use notedrop_store::Record;

use crate::error::BotResult;

/// How the bot files incoming content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotMode {
    /// Everything is appended to one shared note.
    OneNote,
    /// Each message becomes its own note.
    MultipleNotes,
}

impl BotMode {
    /// Human-readable title, as shown on the chat keyboard.
    pub fn title(&self) -> &'static str {
        match self {
            Self::OneNote => "One note",
            Self::MultipleNotes => "Multiple notes",
        }
    }
}

/// A multi-step conversation the user is in the middle of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    /// Waiting for the user to pick a mode.
    SwitchMode,
    /// Waiting for the user to name a notebook.
    SwitchNotebook,
}

/// Access level granted during notes-service sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPermission {
    /// Create notes only.
    #[default]
    Basic,
    /// Read and update existing notes too.
    Full,
}

/// Telegram-side identity of the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelegramData {
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Notes-service access token and its permission level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub permission: AccessPermission,
}

/// Pending OAuth handshake data, kept only while a sign-in is in flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OauthData {
    pub token: String,
    pub secret: String,
    pub callback_key: String,
}

/// Destination notebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookInfo {
    pub name: String,
    pub guid: String,
}

/// Notes-service side of the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotesAccount {
    #[serde(default)]
    pub access: AccessData,
    #[serde(default)]
    pub notebook: NotebookInfo,
    /// Set when the bot is in one-note mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OauthData>,
}

/// One registered bot user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotUser {
    /// Telegram user id, used as the record id.
    pub id: i64,
    pub telegram: TelegramData,
    #[serde(default)]
    pub evernote: NotesAccount,
    pub bot_mode: BotMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<UserState>,
}

impl BotUser {
    /// A freshly registered user: multiple-notes mode, no sign-in yet.
    pub fn new(id: i64, chat_id: i64) -> Self {
        Self {
            id,
            telegram: TelegramData {
                chat_id,
                ..TelegramData::default()
            },
            evernote: NotesAccount::default(),
            bot_mode: BotMode::MultipleNotes,
            state: None,
        }
    }

    /// Whether the sign-in flow has completed.
    pub fn is_signed_in(&self) -> bool {
        self.evernote.access.token.is_some()
    }

    pub fn to_record(&self) -> BotResult<Record> {
        Ok(Record::from_model(self)?)
    }

    pub fn from_record(record: &Record) -> BotResult<Self> {
        Ok(record.to_model()?)
    }
}

/// A webhook update the bot failed to process, kept for later inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUpdate {
    /// The raw update payload as received.
    pub update: Value,
    /// Rendered error that aborted the handler.
    pub error: String,
}

impl FailedUpdate {
    pub fn new(update: Value, error: impl std::fmt::Display) -> Self {
        Self {
            update,
            error: error.to_string(),
        }
    }

    pub fn to_record(&self) -> BotResult<Record> {
        Ok(Record::from_model(self)?)
    }
}

// ── tests ────────────────────────────────────────────────────────────
