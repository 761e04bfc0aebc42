//! The dispatch table from [`Message`] to its handler (TEA pattern)

use tracing::warn;

use crate::message::Message;
use crate::state::AppState;

use super::{document, status, UpdateResult};

/// Apply one message to the state.
///
/// Pure except for logging: effects come back in the [`UpdateResult`]
/// for the engine to dispatch.
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        // ─────────────────────────────────────────────────────────
        // Document Lifecycle
        // ─────────────────────────────────────────────────────────
        Message::OpenDocument { source, password } => {
            document::handle_open_document(state, source, password)
        }

        Message::SubmitPassword(password) => document::handle_submit_password(state, password),

        Message::PasswordEdited => document::handle_password_edited(state),

        Message::RenderSucceeded {
            attempt,
            page_count,
        } => document::handle_render_succeeded(state, attempt, page_count),

        Message::RenderFailed { attempt, failure } => {
            document::handle_render_failed(state, attempt, failure)
        }

        Message::RenderProgress(progress) => document::handle_render_progress(state, progress),

        // ─────────────────────────────────────────────────────────
        // Worker Lifecycle
        // ─────────────────────────────────────────────────────────
        Message::WorkerReady(ready) => document::handle_worker_ready(state, ready),

        Message::WorkerExited { code } => document::handle_worker_exited(state, code),

        // ─────────────────────────────────────────────────────────
        // Source Watcher
        // ─────────────────────────────────────────────────────────
        Message::SourceChanged => document::handle_source_changed(state),

        Message::WatcherError { message } => {
            warn!("Source watcher error: {}", message);
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // User Status
        // ─────────────────────────────────────────────────────────
        Message::EditStatusDraft { emoji_code, text } => {
            status::handle_edit_draft(emoji_code, text)
        }

        Message::SaveStatus => status::handle_save(state),

        Message::ClearStatus => status::handle_clear(),

        Message::StoreChanged { key, value } => status::handle_store_changed(state, key, value),

        // ─────────────────────────────────────────────────────────
        // Control
        // ─────────────────────────────────────────────────────────
        Message::Quit => {
            state.should_quit = true;
            UpdateResult::none()
        }
    }
}
