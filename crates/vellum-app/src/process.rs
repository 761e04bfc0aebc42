//! The per-message pump: update, dispatch, repeat.
//!
//! Runs one message through `handler::update`, hands any returned action
//! to the dispatcher, and keeps going while handlers chain follow-up
//! messages.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::actions::handle_action;
use crate::handler;
use crate::message::Message;
use crate::renderer::DocumentRenderer;
use crate::sink::LoadCompleteSink;
use crate::state::AppState;
use crate::store::KeyValueStore;

/// Drain one message and the chain it produces.
pub fn process_message<R, S>(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    renderer: &R,
    sink: &Arc<dyn LoadCompleteSink>,
    store: &Arc<S>,
    status_dir: Option<&Path>,
) where
    R: DocumentRenderer + Clone + Send + Sync + 'static,
    S: KeyValueStore + Sync + 'static,
{
    let mut next = Some(message);
    while let Some(current) = next {
        let result = handler::update(state, current);

        if let Some(action) = result.action {
            handle_action(action, msg_tx.clone(), renderer, sink, store, status_dir);
        }

        next = result.message;
    }
}
