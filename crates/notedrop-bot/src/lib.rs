//! # notedrop-bot
//!
//! Bot layer for notedrop: relays content a user sends to a chat bot into a
//! notes service, tracking per-user mode/state and destination notebook.
//!
//! This crate owns the pieces with real state — the user model, the
//! mode/notebook state machine, the per-user session cache, and
//! configuration — and drives storage through [`notedrop_store`]. The HTTP
//! entry point and the outbound chat/notes API transports are external
//! collaborators.

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod state;

// ── re-exports ───────────────────────────────────────────────────────

pub use bot::Bot;
pub use config::{Config, TelegramConfig};
pub use error::{BotError, BotResult};
pub use models::{
    AccessData, AccessPermission, BotMode, BotUser, FailedUpdate, NotebookInfo, NotesAccount,
    OauthData, TelegramData, UserState,
};
pub use session::{NotesSession, SessionCache};
pub use state::{
    attach_shared_note, begin_switch_mode, begin_switch_notebook, parse_mode, parse_selection,
    switch_mode, switch_notebook, Transition,
};
