//! Update-loop tests: every transition in one place

use super::*;
use crate::message::Message;
use crate::state::AppState;
use serde_json::json;
use vellum_core::{LoadPhase, RenderFailure, RenderProgress, WorkerReady};

/// Open a fixed document and return the first attempt number
fn open(state: &mut AppState, password: Option<&str>) -> u64 {
    let result = update(
        state,
        Message::OpenDocument {
            source: DocumentSource::from("docs/report.pdf"),
            password: password.map(String::from),
        },
    );
    assert!(matches!(
        result.action,
        Some(UpdateAction::StartRender { .. })
    ));
    current_attempt(state)
}

fn current_attempt(state: &AppState) -> u64 {
    state.document.as_ref().unwrap().attempt
}

/// Deliver a failure outcome for the active attempt
fn fail_with(state: &mut AppState, reason: &str) -> UpdateResult {
    let attempt = current_attempt(state);
    update(
        state,
        Message::RenderFailed {
            attempt,
            failure: RenderFailure::classify(reason),
        },
    )
}

/// Deliver a success outcome for the active attempt
fn succeed(state: &mut AppState) -> UpdateResult {
    let attempt = current_attempt(state);
    update(
        state,
        Message::RenderSucceeded {
            attempt,
            page_count: Some(3),
        },
    )
}

// ─────────────────────────────────────────────────────────
// Password challenge
// ─────────────────────────────────────────────────────────

#[test]
fn test_open_document_starts_render() {
    let mut state = AppState::new();

    let result = update(
        &mut state,
        Message::OpenDocument {
            source: DocumentSource::from("docs/report.pdf"),
            password: None,
        },
    );

    let doc = state.document.as_ref().unwrap();
    assert_eq!(doc.phase, LoadPhase::Loading);
    match result.action {
        Some(UpdateAction::StartRender {
            attempt, password, ..
        }) => {
            assert_eq!(attempt, doc.attempt);
            assert_eq!(password, "");
        }
        other => panic!("expected StartRender, got {:?}", other),
    }
}

#[test]
fn test_open_document_with_initial_password() {
    let mut state = AppState::new();

    let result = update(
        &mut state,
        Message::OpenDocument {
            source: DocumentSource::from("locked.pdf"),
            password: Some("hunter2".to_string()),
        },
    );

    match result.action {
        Some(UpdateAction::StartRender { password, .. }) => assert_eq!(password, "hunter2"),
        other => panic!("expected StartRender, got {:?}", other),
    }
}

#[test]
fn test_password_failure_opens_challenge() {
    // Any casing, any surrounding text
    for reason in [
        "Password required or incorrect password.",
        "PASSWORD required",
        "err: bad password given, retry",
    ] {
        let mut state = AppState::new();
        open(&mut state, None);

        fail_with(&mut state, reason);

        assert_eq!(
            state.phase(),
            Some(LoadPhase::AwaitingPassword),
            "reason {:?} should open the challenge",
            reason
        );
    }
}

#[test]
fn test_challenge_without_submission_keeps_flag_false() {
    let mut state = AppState::new();
    open(&mut state, None);

    fail_with(&mut state, "Password required or incorrect password.");

    assert!(!state.document.as_ref().unwrap().password_known_invalid);
}

#[test]
fn test_rejected_submission_sets_invalid_flag() {
    let mut state = AppState::new();
    let first = open(&mut state, None);
    fail_with(&mut state, "Password required or incorrect password.");

    let result = update(&mut state, Message::SubmitPassword("wrong".to_string()));

    // The submission starts a fresh attempt with the new password
    match result.action {
        Some(UpdateAction::StartRender {
            attempt, password, ..
        }) => {
            assert!(attempt > first);
            assert_eq!(password, "wrong");
        }
        other => panic!("expected StartRender, got {:?}", other),
    }

    fail_with(&mut state, "Password required or incorrect password.");

    let doc = state.document.as_ref().unwrap();
    assert_eq!(doc.phase, LoadPhase::AwaitingPassword);
    assert!(doc.password_known_invalid);
}

#[test]
fn test_password_edit_clears_invalid_flag() {
    let mut state = AppState::new();
    open(&mut state, None);
    fail_with(&mut state, "Password required or incorrect password.");
    update(&mut state, Message::SubmitPassword("wrong".to_string()));
    fail_with(&mut state, "Password required or incorrect password.");
    assert!(state.document.as_ref().unwrap().password_known_invalid);

    update(&mut state, Message::PasswordEdited);

    assert!(!state.document.as_ref().unwrap().password_known_invalid);
}

#[test]
fn test_submission_clears_flag_on_leaving_challenge() {
    let mut state = AppState::new();
    open(&mut state, None);
    fail_with(&mut state, "Password required or incorrect password.");
    update(&mut state, Message::SubmitPassword("first".to_string()));
    fail_with(&mut state, "Password required or incorrect password.");
    assert!(state.document.as_ref().unwrap().password_known_invalid);

    update(&mut state, Message::SubmitPassword("second".to_string()));

    let doc = state.document.as_ref().unwrap();
    assert_eq!(doc.phase, LoadPhase::Loading);
    assert!(!doc.password_known_invalid);
    assert_eq!(doc.current_password, "second");
}

#[test]
fn test_submission_outside_challenge_ignored() {
    let mut state = AppState::new();
    open(&mut state, None);
    let before = state.document.clone();

    let result = update(&mut state, Message::SubmitPassword("early".to_string()));

    assert!(result.action.is_none());
    assert_eq!(state.document, before);
}

#[test]
fn test_generic_failure_is_terminal() {
    let mut state = AppState::new();
    open(&mut state, None);

    let result = fail_with(&mut state, "corrupt xref table");

    assert!(result.action.is_none());
    let doc = state.document.as_ref().unwrap();
    assert_eq!(doc.phase, LoadPhase::Failed);
    assert_eq!(
        doc.failure,
        Some(RenderFailure::Generic("corrupt xref table".to_string()))
    );

    // A duplicate outcome for the same attempt changes nothing
    let before = state.document.clone();
    fail_with(&mut state, "corrupt xref table");
    assert_eq!(state.document, before);
}

#[test]
fn test_load_complete_notified_exactly_once() {
    let mut state = AppState::new();
    open(&mut state, None);

    let result = succeed(&mut state);
    assert!(matches!(
        result.action,
        Some(UpdateAction::NotifyLoadComplete)
    ));
    assert_eq!(state.phase(), Some(LoadPhase::Loaded));

    // Reload after a source change succeeds again: no second notification
    update(&mut state, Message::SourceChanged);
    let result = succeed(&mut state);
    assert!(result.action.is_none());
    assert_eq!(state.phase(), Some(LoadPhase::Loaded));
}

#[test]
fn test_stale_outcomes_ignored() {
    let mut state = AppState::new();
    let stale = open(&mut state, None);
    fail_with(&mut state, "Password required or incorrect password.");
    update(&mut state, Message::SubmitPassword("secret".to_string()));
    let before = state.document.clone();

    // Outcomes for the superseded first attempt arrive late
    let result = update(
        &mut state,
        Message::RenderSucceeded {
            attempt: stale,
            page_count: Some(9),
        },
    );
    assert!(result.action.is_none());
    assert_eq!(state.document, before);

    let result = update(
        &mut state,
        Message::RenderFailed {
            attempt: stale,
            failure: RenderFailure::classify("corrupt xref table"),
        },
    );
    assert!(result.action.is_none());
    assert_eq!(state.document, before);
}

#[test]
fn test_outcome_ignored_when_no_attempt_in_flight() {
    let mut state = AppState::new();
    open(&mut state, None);
    fail_with(&mut state, "Password required or incorrect password.");
    let before = state.document.clone();

    // A duplicate success for the current attempt while awaiting input
    let attempt = current_attempt(&state);
    let result = update(
        &mut state,
        Message::RenderSucceeded {
            attempt,
            page_count: Some(2),
        },
    );

    assert!(result.action.is_none());
    assert_eq!(state.document, before);
}

// ─────────────────────────────────────────────────────────
// Worker lifecycle
// ─────────────────────────────────────────────────────────

#[test]
fn test_worker_ready_recorded() {
    let mut state = AppState::new();

    update(
        &mut state,
        Message::WorkerReady(WorkerReady {
            version: "1.4.0".to_string(),
            pid: 4242,
        }),
    );

    assert_eq!(state.worker.as_ref().map(|w| w.pid), Some(4242));
}

#[test]
fn test_worker_exit_fails_pending_attempt() {
    let mut state = AppState::new();
    open(&mut state, None);

    update(&mut state, Message::WorkerExited { code: Some(9) });

    let doc = state.document.as_ref().unwrap();
    assert_eq!(doc.phase, LoadPhase::Failed);
    match &doc.failure {
        Some(RenderFailure::Generic(reason)) => {
            assert!(reason.contains("exited with code 9"));
        }
        other => panic!("expected generic failure, got {:?}", other),
    }
    assert!(state.worker.is_none());
}

#[test]
fn test_worker_exit_when_settled_keeps_phase() {
    let mut state = AppState::new();
    open(&mut state, None);
    succeed(&mut state);

    update(&mut state, Message::WorkerExited { code: Some(0) });

    assert_eq!(state.phase(), Some(LoadPhase::Loaded));
    assert!(state.worker.is_none());
}

// ─────────────────────────────────────────────────────────
// Source watcher
// ─────────────────────────────────────────────────────────

#[test]
fn test_source_change_reloads_when_loaded() {
    let mut state = AppState::new();
    open(&mut state, Some("hunter2"));
    let first = current_attempt(&state);
    succeed(&mut state);

    let result = update(&mut state, Message::SourceChanged);

    match result.action {
        Some(UpdateAction::StartRender {
            attempt, password, ..
        }) => {
            assert!(attempt > first);
            assert_eq!(password, "hunter2");
        }
        other => panic!("expected StartRender, got {:?}", other),
    }
    assert_eq!(state.phase(), Some(LoadPhase::Loading));
}

#[test]
fn test_source_change_reloads_after_failure() {
    let mut state = AppState::new();
    open(&mut state, None);
    fail_with(&mut state, "corrupt xref table");

    let result = update(&mut state, Message::SourceChanged);

    assert!(matches!(
        result.action,
        Some(UpdateAction::StartRender { .. })
    ));
    assert_eq!(state.phase(), Some(LoadPhase::Loading));
    assert!(state.document.as_ref().unwrap().failure.is_none());
}

#[test]
fn test_source_change_ignored_during_challenge() {
    let mut state = AppState::new();
    open(&mut state, None);
    fail_with(&mut state, "Password required or incorrect password.");
    let before = state.document.clone();

    let result = update(&mut state, Message::SourceChanged);

    assert!(result.action.is_none());
    assert_eq!(state.document, before);
}

#[test]
fn test_source_change_ignored_while_loading() {
    let mut state = AppState::new();
    open(&mut state, None);
    let before = state.document.clone();

    let result = update(&mut state, Message::SourceChanged);

    assert!(result.action.is_none());
    assert_eq!(state.document, before);
}

// ─────────────────────────────────────────────────────────
// Render progress
// ─────────────────────────────────────────────────────────

#[test]
fn test_progress_recorded_while_loading() {
    let mut state = AppState::new();
    open(&mut state, None);

    update(
        &mut state,
        Message::RenderProgress(RenderProgress {
            request_id: 5,
            pages_done: 2,
            page_count: Some(10),
            finished: false,
        }),
    );

    let doc = state.document.as_ref().unwrap();
    assert_eq!(doc.pages_done, 2);
    assert_eq!(doc.page_count, Some(10));
}

// ─────────────────────────────────────────────────────────
// User status
// ─────────────────────────────────────────────────────────

#[test]
fn test_edit_draft_returns_write_action() {
    let mut state = AppState::new();

    let result = update(
        &mut state,
        Message::EditStatusDraft {
            emoji_code: ":coffee:".to_string(),
            text: "Focus time".to_string(),
        },
    );

    match result.action {
        Some(UpdateAction::WriteStatusDraft(status)) => {
            assert_eq!(status.emoji_code, ":coffee:");
            assert_eq!(status.text, "Focus time");
        }
        other => panic!("expected WriteStatusDraft, got {:?}", other),
    }
}

#[test]
fn test_save_without_draft_is_noop() {
    let mut state = AppState::new();

    let result = update(&mut state, Message::SaveStatus);

    assert!(result.action.is_none());
}

#[test]
fn test_save_commits_effective_pair() {
    let mut state = AppState::new();
    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::SAVED_KEY.to_string(),
            value: Some(json!({"emoji_code": ":palm_tree:", "text": "On vacation"})),
        },
    );
    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::DRAFT_KEY.to_string(),
            value: Some(json!({"emoji_code": ":coffee:", "text": ""})),
        },
    );

    let result = update(&mut state, Message::SaveStatus);

    // Draft emoji set: both halves come from the draft
    match result.action {
        Some(UpdateAction::CommitStatus(status)) => {
            assert_eq!(status.emoji_code, ":coffee:");
            assert_eq!(status.text, "");
        }
        other => panic!("expected CommitStatus, got {:?}", other),
    }
}

#[test]
fn test_save_with_text_only_draft_keeps_saved_emoji() {
    let mut state = AppState::new();
    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::SAVED_KEY.to_string(),
            value: Some(json!({"emoji_code": ":palm_tree:", "text": "On vacation"})),
        },
    );
    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::DRAFT_KEY.to_string(),
            value: Some(json!({"emoji_code": "", "text": "typing..."})),
        },
    );

    let result = update(&mut state, Message::SaveStatus);

    // Empty draft emoji: the save falls back to the saved pair
    match result.action {
        Some(UpdateAction::CommitStatus(status)) => {
            assert_eq!(status.emoji_code, ":palm_tree:");
            assert_eq!(status.text, "On vacation");
        }
        other => panic!("expected CommitStatus, got {:?}", other),
    }
}

#[test]
fn test_clear_returns_discard() {
    let mut state = AppState::new();

    let result = update(&mut state, Message::ClearStatus);

    assert!(matches!(result.action, Some(UpdateAction::DiscardStatus)));
}

#[test]
fn test_store_changed_mirrors_draft_and_saved() {
    let mut state = AppState::new();

    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::DRAFT_KEY.to_string(),
            value: Some(json!({"emoji_code": ":book:", "text": "Reading"})),
        },
    );
    assert!(state.status.has_draft());

    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::DRAFT_KEY.to_string(),
            value: None,
        },
    );
    assert!(!state.status.has_draft());
    assert!(state.status.draft.is_none());
}

#[test]
fn test_store_changed_ignores_unknown_key() {
    let mut state = AppState::new();
    let before = state.status.clone();

    update(
        &mut state,
        Message::StoreChanged {
            key: "some.other.key".to_string(),
            value: Some(json!({"emoji_code": ":x:", "text": "nope"})),
        },
    );

    assert_eq!(state.status, before);
}

#[test]
fn test_store_changed_malformed_value_clears_mirror() {
    let mut state = AppState::new();
    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::DRAFT_KEY.to_string(),
            value: Some(json!({"emoji_code": ":book:", "text": "Reading"})),
        },
    );
    assert!(state.status.draft.is_some());

    update(
        &mut state,
        Message::StoreChanged {
            key: crate::status::DRAFT_KEY.to_string(),
            value: Some(json!("not an object")),
        },
    );

    assert!(state.status.draft.is_none());
}

// ─────────────────────────────────────────────────────────
// Control
// ─────────────────────────────────────────────────────────

#[test]
fn test_quit_sets_should_quit() {
    let mut state = AppState::new();
    assert!(!state.should_quit);

    update(&mut state, Message::Quit);

    assert!(state.should_quit);
}

#[test]
fn test_watcher_error_is_logged_only() {
    let mut state = AppState::new();
    open(&mut state, None);
    let before = state.document.clone();

    let result = update(
        &mut state,
        Message::WatcherError {
            message: "inotify limit reached".to_string(),
        },
    );

    assert!(result.action.is_none());
    assert_eq!(state.document, before);
}
