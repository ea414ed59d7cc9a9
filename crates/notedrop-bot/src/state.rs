//! Mode and notebook switching.
//!
//! The bot walks a user through two-step conversations: `/switch_mode` and
//! `/notebook` put the user into a pending [`UserState`]; the next message
//! is the selection. Transitions here are pure — they mutate the user and
//! return a [`Transition`] describing what the caller (the webhook handler,
//! which owns the chat and notes-service clients) must do next.

use tracing::debug;

use crate::error::{BotError, BotResult};
use crate::models::{AccessPermission, BotMode, BotUser, NotebookInfo, UserState};

/// What the caller must do after a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Tell the user nothing changed.
    AlreadyInMode { title: String },
    /// Mode switched; confirm to the user.
    SwitchedMode { title: String },
    /// One-note mode is permitted: create the shared note, then record it
    /// with [`attach_shared_note`].
    CreateSharedNote,
    /// One-note mode needs broader access: start a full-permission sign-in.
    RequestFullAccess,
    /// Notebook switched; confirm with its name.
    SwitchedNotebook { name: String },
}

/// Strip the `> … <` keyboard markers from a selection, if present.
pub fn parse_selection(text: &str) -> &str {
    if let Some(inner) = text.strip_prefix("> ").and_then(|t| t.strip_suffix(" <")) {
        inner
    } else {
        text
    }
}

/// Resolve a selection string to a mode and its display title.
///
/// `"One note"` and `"Multiple notes"` (with or without keyboard markers)
/// are the only valid selections; anything else is [`BotError::UnknownMode`].
pub fn parse_mode(text: &str) -> BotResult<(BotMode, String)> {
    let title = parse_selection(text).to_string();
    let normalized = title.to_lowercase().replace(' ', "_");
    let mode = match normalized.as_str() {
        "one_note" => BotMode::OneNote,
        "multiple_notes" => BotMode::MultipleNotes,
        _ => return Err(BotError::UnknownMode(title)),
    };
    Ok((mode, title))
}

/// Put the user into the mode-selection conversation.
pub fn begin_switch_mode(user: &mut BotUser) {
    user.state = Some(UserState::SwitchMode);
}

/// Put the user into the notebook-selection conversation.
pub fn begin_switch_notebook(user: &mut BotUser) {
    user.state = Some(UserState::SwitchNotebook);
}

/// Handle the user's mode selection. Clears the pending state.
pub fn switch_mode(user: &mut BotUser, selection: &str) -> BotResult<Transition> {
    let (new_mode, title) = parse_mode(selection)?;
    user.state = None;

    if user.bot_mode == new_mode {
        debug!(user_id = user.id, mode = %title, "mode unchanged");
        return Ok(Transition::AlreadyInMode { title });
    }

    match new_mode {
        BotMode::MultipleNotes => {
            user.evernote.shared_note_id = None;
            user.bot_mode = BotMode::MultipleNotes;
            debug!(user_id = user.id, "switched to multiple_notes");
            Ok(Transition::SwitchedMode { title })
        }
        BotMode::OneNote => {
            // One-note mode appends to a shared note, which requires
            // update permission. The mode flips only once the shared note
            // exists (attach_shared_note).
            if user.evernote.access.permission == AccessPermission::Full {
                Ok(Transition::CreateSharedNote)
            } else {
                Ok(Transition::RequestFullAccess)
            }
        }
    }
}

/// Record the freshly created shared note and complete the switch to
/// one-note mode.
pub fn attach_shared_note(user: &mut BotUser, note_guid: impl Into<String>) {
    user.bot_mode = BotMode::OneNote;
    user.evernote.shared_note_id = Some(note_guid.into());
    debug!(user_id = user.id, "switched to one_note");
}

/// Handle the user's notebook selection, given the notebook the caller
/// resolved by name (or `None` when the lookup found nothing).
pub fn switch_notebook(
    user: &mut BotUser,
    selection: &str,
    resolved: Option<NotebookInfo>,
) -> BotResult<Transition> {
    let name = parse_selection(selection);
    let notebook = resolved.ok_or_else(|| BotError::NotebookNotFound(name.to_string()))?;
    user.state = None;
    user.evernote.notebook = notebook.clone();
    debug!(user_id = user.id, notebook = %notebook.name, "notebook switched");
    Ok(Transition::SwitchedNotebook {
        name: notebook.name,
    })
}

// ── tests ────────────────────────────────────────────────────────────
