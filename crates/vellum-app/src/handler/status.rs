//! User status handlers
//!
//! The handlers never touch the store directly: edits and saves come back
//! as actions, and the store's change notifications (mirrored in via
//! `StoreChanged`) are the single source of truth for draft/saved values.

use serde_json::Value;
use tracing::{debug, warn};

use crate::state::AppState;
use crate::status::{UserStatus, DRAFT_KEY, SAVED_KEY};

use super::{UpdateAction, UpdateResult};

/// Handle a draft edit - writes the draft through the store
pub fn handle_edit_draft(emoji_code: String, text: String) -> UpdateResult {
    UpdateResult::action(UpdateAction::WriteStatusDraft(UserStatus::new(
        emoji_code, text,
    )))
}

/// Handle a save - commits the effective status, no-op without a draft
pub fn handle_save(state: &mut AppState) -> UpdateResult {
    if !state.status.has_draft() {
        debug!("Save ignored: no status draft");
        return UpdateResult::none();
    }

    UpdateResult::action(UpdateAction::CommitStatus(state.status.effective_status()))
}

/// Handle a clear - removes saved status and draft
pub fn handle_clear() -> UpdateResult {
    UpdateResult::action(UpdateAction::DiscardStatus)
}

/// Mirror a store change notification into state
pub fn handle_store_changed(
    state: &mut AppState,
    key: String,
    value: Option<Value>,
) -> UpdateResult {
    let status = value.and_then(|v| match serde_json::from_value::<UserStatus>(v) {
        Ok(status) => Some(status),
        Err(err) => {
            warn!("Malformed status value under '{}': {}", key, err);
            None
        }
    });

    match key.as_str() {
        DRAFT_KEY => state.status.draft = status,
        SAVED_KEY => state.status.saved = status,
        other => debug!("Ignoring store change for unobserved key '{}'", other),
    }

    UpdateResult::none()
}
