//! Document load and password challenge handlers
//!
//! All transitions of the load state machine live here. Outcome messages
//! carry the attempt number of the request that produced them; anything
//! not matching the active attempt is stale and ignored without touching
//! state.

use tracing::{debug, info, warn};

use crate::state::{AppState, DocumentLoadState};
use vellum_core::{DocumentSource, LoadPhase, RenderFailure, RenderProgress, WorkerReady};

use super::{UpdateAction, UpdateResult};

/// Handle open document message - starts the first render attempt
pub fn handle_open_document(
    state: &mut AppState,
    source: DocumentSource,
    password: Option<String>,
) -> UpdateResult {
    info!("Opening document: {}", source);

    let mut doc = DocumentLoadState::new(source, password);
    let attempt = doc.begin_attempt();
    let action = UpdateAction::StartRender {
        attempt,
        source: doc.source.clone(),
        password: doc.current_password.clone(),
    };
    state.document = Some(doc);

    UpdateResult::action(action)
}

/// Handle password submission - starts a fresh attempt with the new password
///
/// The rendering capability does not react to in-place password changes, so
/// a new attempt (and a new request) is mandatory. Leaving
/// `AwaitingPassword` clears the invalid flag.
pub fn handle_submit_password(state: &mut AppState, password: String) -> UpdateResult {
    let Some(doc) = state.document.as_mut() else {
        warn!("Password submitted with no document open");
        return UpdateResult::none();
    };

    if doc.phase != LoadPhase::AwaitingPassword {
        debug!(
            "Ignoring password submission in phase {:?} (no challenge pending)",
            doc.phase
        );
        return UpdateResult::none();
    }

    doc.set_password(password);
    let attempt = doc.begin_attempt();

    UpdateResult::action(UpdateAction::StartRender {
        attempt,
        source: doc.source.clone(),
        password: doc.current_password.clone(),
    })
}

/// Handle password edit - clears the invalid highlight while typing
pub fn handle_password_edited(state: &mut AppState) -> UpdateResult {
    if let Some(doc) = state.document.as_mut() {
        if doc.phase == LoadPhase::AwaitingPassword {
            doc.clear_invalid_flag();
        }
    }
    UpdateResult::none()
}

/// Handle render success for an attempt
pub fn handle_render_succeeded(
    state: &mut AppState,
    attempt: u64,
    page_count: Option<u32>,
) -> UpdateResult {
    let Some(doc) = state.document.as_mut() else {
        debug!("Render success with no document open");
        return UpdateResult::none();
    };

    if !doc.is_current(attempt) {
        debug!(
            "Ignoring stale render success (attempt {}, current {})",
            attempt, doc.attempt
        );
        return UpdateResult::none();
    }

    if doc.phase != LoadPhase::Loading {
        debug!(
            "Ignoring render success in phase {:?} (no attempt in flight)",
            doc.phase
        );
        return UpdateResult::none();
    }

    info!(
        "Document loaded ({} pages)",
        page_count.map_or("?".to_string(), |n| n.to_string())
    );

    if doc.enter_loaded(page_count) {
        UpdateResult::action(UpdateAction::NotifyLoadComplete)
    } else {
        UpdateResult::none()
    }
}

/// Handle render failure for an attempt
///
/// Password failures open (or re-open) the challenge; anything else is
/// terminal for the session.
pub fn handle_render_failed(
    state: &mut AppState,
    attempt: u64,
    failure: RenderFailure,
) -> UpdateResult {
    let Some(doc) = state.document.as_mut() else {
        debug!("Render failure with no document open");
        return UpdateResult::none();
    };

    if !doc.is_current(attempt) {
        debug!(
            "Ignoring stale render failure (attempt {}, current {})",
            attempt, doc.attempt
        );
        return UpdateResult::none();
    }

    if doc.phase != LoadPhase::Loading {
        debug!(
            "Ignoring render failure in phase {:?} (no attempt in flight)",
            doc.phase
        );
        return UpdateResult::none();
    }

    match failure {
        RenderFailure::PasswordRequiredOrInvalid(reason) => {
            debug!("Password challenge: {}", reason);
            doc.enter_awaiting_password();
        }
        failure @ RenderFailure::Generic(_) => {
            warn!("Document load failed: {}", failure);
            doc.enter_failed(failure);
        }
    }

    UpdateResult::none()
}

/// Handle a worker progress event (display only)
pub fn handle_render_progress(state: &mut AppState, progress: RenderProgress) -> UpdateResult {
    if let Some(doc) = state.document.as_mut() {
        if !doc.record_progress(&progress) {
            debug!(
                "Ignoring progress for request {} (superseded or not loading)",
                progress.request_id
            );
        }
    }
    UpdateResult::none()
}

/// Handle worker ready announcement
pub fn handle_worker_ready(state: &mut AppState, ready: WorkerReady) -> UpdateResult {
    info!(
        "Render worker ready (version {}, pid {})",
        ready.version, ready.pid
    );
    state.worker = Some(ready);
    UpdateResult::none()
}

/// Handle worker exit
///
/// An exit while an attempt is in flight fails that attempt with a generic
/// failure; otherwise only the worker identity is cleared.
pub fn handle_worker_exited(state: &mut AppState, code: Option<i32>) -> UpdateResult {
    state.worker = None;

    if let Some(doc) = state.document.as_mut() {
        if doc.phase == LoadPhase::Loading {
            let reason = match code {
                Some(c) => format!("Render worker exited with code {}", c),
                None => "Render worker exited".to_string(),
            };
            warn!("{} while a render attempt was pending", reason);
            doc.enter_failed(RenderFailure::Generic(reason));
        }
    }

    UpdateResult::none()
}

/// Handle a change to the source file on disk
///
/// In `Loaded` or `Failed` the bytes on disk are new, so a fresh load
/// starts with the current password. During a challenge or an in-flight
/// attempt the change is ignored.
pub fn handle_source_changed(state: &mut AppState) -> UpdateResult {
    let Some(doc) = state.document.as_mut() else {
        return UpdateResult::none();
    };

    match doc.phase {
        LoadPhase::Loaded | LoadPhase::Failed => {
            info!("Source changed on disk, reloading: {}", doc.source);
            let attempt = doc.begin_attempt();
            UpdateResult::action(UpdateAction::StartRender {
                attempt,
                source: doc.source.clone(),
                password: doc.current_password.clone(),
            })
        }
        LoadPhase::AwaitingPassword | LoadPhase::Loading => {
            debug!("Ignoring source change in phase {:?}", doc.phase);
            UpdateResult::none()
        }
    }
}
