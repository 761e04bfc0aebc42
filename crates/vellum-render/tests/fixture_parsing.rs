//! The checked-in worker transcripts must keep parsing.

// The message type lives in core; parsing is a render-crate concern.
use vellum_render::{parse_worker_message, WorkerMessage};

use vellum_core::RenderFailure;

#[test]
fn test_worker_ready_fixture_parses() {
    let json = include_str!("fixtures/worker_responses/worker_ready.json");
    let msg = parse_worker_message(json);
    assert!(matches!(msg, Some(WorkerMessage::Ready(_))));

    if let Some(WorkerMessage::Ready(ready)) = msg {
        assert_eq!(ready.version, "0.3.1");
        assert_eq!(ready.pid, 12345);
    }
}

#[test]
fn test_render_success_fixture_parses() {
    let json = include_str!("fixtures/worker_responses/render_success.json");
    let msg = parse_worker_message(json).unwrap();
    assert!(matches!(msg, WorkerMessage::Response { .. }));
    assert!(!msg.is_error());

    if let WorkerMessage::Response { id, result, .. } = msg {
        assert_eq!(id, serde_json::json!(1));
        assert_eq!(result.unwrap()["pageCount"], 12);
    }
}

#[test]
fn test_password_error_fixture_classifies_as_password_failure() {
    let json = include_str!("fixtures/worker_responses/password_error.json");
    let msg = parse_worker_message(json).unwrap();
    assert!(msg.is_error());

    // The error string is what the challenge decision hangs on
    if let WorkerMessage::Response {
        error: Some(error), ..
    } = msg
    {
        let failure = RenderFailure::classify(error.as_str().unwrap());
        assert!(failure.is_password());
    } else {
        panic!("Expected an error response");
    }
}

#[test]
fn test_render_sequence_fixture_parses() {
    let json = include_str!("fixtures/worker_responses/render_sequence.json");
    let lines: Vec<serde_json::Value> = serde_json::from_str(json).unwrap();
    assert_eq!(lines.len(), 3);

    // First progress arrives before the worker knows the page count
    let line1 = serde_json::to_string(&lines[0]).unwrap();
    let msg1 = parse_worker_message(&line1);
    assert!(matches!(msg1, Some(WorkerMessage::RenderProgress(_))));
    if let Some(WorkerMessage::RenderProgress(progress)) = msg1 {
        assert_eq!(progress.request_id, 7);
        assert_eq!(progress.page_count, None);
    }

    let line2 = serde_json::to_string(&lines[1]).unwrap();
    let msg2 = parse_worker_message(&line2);
    assert!(matches!(msg2, Some(WorkerMessage::RenderProgress(_))));
    if let Some(WorkerMessage::RenderProgress(progress)) = msg2 {
        assert_eq!(progress.pages_done, 5);
        assert_eq!(progress.page_count, Some(9));
    }

    let line3 = serde_json::to_string(&lines[2]).unwrap();
    let msg3 = parse_worker_message(&line3);
    assert!(matches!(msg3, Some(WorkerMessage::Response { .. })));
}

#[test]
fn test_unknown_event_fixture_falls_back() {
    let json = include_str!("fixtures/worker_responses/unknown_event.json");
    let msg = parse_worker_message(json).unwrap();
    assert!(matches!(msg, WorkerMessage::UnknownEvent { .. }));

    if let WorkerMessage::UnknownEvent { event, params } = msg {
        assert_eq!(event, "worker.metrics");
        assert_eq!(params["rssBytes"], 104857600);
    }
}

#[test]
fn test_no_fixture_has_rotted() {
    let fixtures = [
        (
            "worker_ready",
            include_str!("fixtures/worker_responses/worker_ready.json"),
        ),
        (
            "render_success",
            include_str!("fixtures/worker_responses/render_success.json"),
        ),
        (
            "password_error",
            include_str!("fixtures/worker_responses/password_error.json"),
        ),
        (
            "render_sequence",
            include_str!("fixtures/worker_responses/render_sequence.json"),
        ),
        (
            "unknown_event",
            include_str!("fixtures/worker_responses/unknown_event.json"),
        ),
    ];

    for (name, fixture) in fixtures {
        if let Err(e) = serde_json::from_str::<serde_json::Value>(fixture) {
            panic!("{name}.json is no longer valid JSON: {e}");
        }
    }
}
