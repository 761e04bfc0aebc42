//! The update layer: pure message handlers and their follow-up effects.
//!
//! Submodules:
//! - `update`: dispatch from [`Message`] to the handler that owns it
//! - `document`: document load and password challenge transitions
//! - `status`: user status drafting and persistence

pub(crate) mod document;
pub(crate) mod status;
pub(crate) mod update;

#[cfg(test)]
mod tests;

use crate::message::Message;
use crate::status::UserStatus;
use vellum_core::DocumentSource;

pub use update::update;

/// Side effects the engine dispatches after a handler returns.
///
/// Handlers mutate [`crate::state::AppState`] and nothing else; anything
/// that touches a channel, the store, or the worker comes back as one of
/// these.
#[derive(Debug, Clone)]
pub enum UpdateAction {
    /// Issue a render request to the worker for this attempt
    StartRender {
        attempt: u64,
        source: DocumentSource,
        password: String,
    },

    /// Invoke the load-complete sink (first successful load only)
    NotifyLoadComplete,

    /// Write the status draft into the store
    WriteStatusDraft(UserStatus),

    /// Commit the effective status: store it under the saved key, drop the
    /// draft, and persist to disk
    CommitStatus(UserStatus),

    /// Remove the saved status and the draft, on disk too
    DiscardStatus,
}

/// What a handler hands back: at most one follow-up message and one action.
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Message to feed back through the update loop
    pub message: Option<Message>,
    /// Effect for the engine to dispatch
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            ..Self::default()
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }
}
