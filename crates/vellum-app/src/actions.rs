//! Action handlers: UpdateAction dispatch and background task spawning

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::message::Message;
use crate::renderer::DocumentRenderer;
use crate::sink::LoadCompleteSink;
use crate::status::{self, DRAFT_KEY, SAVED_KEY};
use crate::store::KeyValueStore;
use crate::UpdateAction;
use vellum_core::RenderFailure;

/// Execute an action by spawning a background task
///
/// Everything that touches the renderer, the store, or the disk runs off
/// the update loop; outcomes come back as messages on `msg_tx`.
pub fn handle_action<R, S>(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    renderer: &R,
    sink: &Arc<dyn LoadCompleteSink>,
    store: &Arc<S>,
    status_dir: Option<&Path>,
) where
    R: DocumentRenderer + Clone + Send + Sync + 'static,
    S: KeyValueStore + Sync + 'static,
{
    match action {
        UpdateAction::StartRender {
            attempt,
            source,
            password,
        } => {
            let renderer = renderer.clone();
            tokio::spawn(async move {
                match renderer.attempt_render(&source, &password).await {
                    Ok(outcome) if outcome.success => {
                        let _ = msg_tx
                            .send(Message::RenderSucceeded {
                                attempt,
                                page_count: outcome.page_count,
                            })
                            .await;
                    }
                    Ok(outcome) => {
                        let failure = outcome.failure.unwrap_or_else(|| {
                            RenderFailure::Generic("Render failed with no reason".to_string())
                        });
                        let _ = msg_tx.send(Message::RenderFailed { attempt, failure }).await;
                    }
                    Err(e) => {
                        // Transport broke: worker gone or request timed out
                        error!("Render request failed: {}", e);
                        let _ = msg_tx
                            .send(Message::RenderFailed {
                                attempt,
                                failure: RenderFailure::Generic(e.to_string()),
                            })
                            .await;
                    }
                }
            });
        }

        UpdateAction::NotifyLoadComplete => {
            sink.notify_load_complete();
        }

        UpdateAction::WriteStatusDraft(draft) => {
            let store = Arc::clone(store);
            tokio::spawn(async move {
                match serde_json::to_value(&draft) {
                    Ok(value) => store.set(DRAFT_KEY, value).await,
                    Err(e) => error!("Failed to serialize status draft: {}", e),
                }
            });
        }

        UpdateAction::CommitStatus(saved) => {
            // Clone data for the async task
            let store = Arc::clone(store);
            let dir = status_dir.map(Path::to_path_buf);
            tokio::spawn(async move {
                match serde_json::to_value(&saved) {
                    Ok(value) => store.set(SAVED_KEY, value).await,
                    Err(e) => {
                        error!("Failed to serialize status: {}", e);
                        return;
                    }
                }
                store.remove(DRAFT_KEY).await;

                if let Some(dir) = dir {
                    match status::save_status(&dir, &saved) {
                        Ok(()) => debug!("Status saved to {:?}", dir),
                        Err(e) => error!("Status save failed: {}", e),
                    }
                }
            });
        }

        UpdateAction::DiscardStatus => {
            let store = Arc::clone(store);
            let dir = status_dir.map(Path::to_path_buf);
            tokio::spawn(async move {
                store.remove(DRAFT_KEY).await;
                store.remove(SAVED_KEY).await;

                if let Some(dir) = dir {
                    match status::clear_status(&dir) {
                        Ok(()) => debug!("Status file cleared"),
                        Err(e) => error!("Status clear failed: {}", e),
                    }
                }
            });
        }
    }
}
