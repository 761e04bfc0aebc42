//! The worker's line protocol.
//!
//! The worker emits one JSON object per stdout line: either a response to a
//! request (`{"id":…,"result"/"error":…}`) or an unsolicited event
//! (`{"event":…,"params":…}`). [`parse_worker_message`] turns one line into
//! a typed [`WorkerMessage`]; lines that are not valid JSON come back as
//! `None` and should be treated as plain log output from the renderer
//! backend.

use serde::Deserialize;

use vellum_core::{RenderProgress, WorkerMessage, WorkerReady};

/// The two wire shapes, told apart by their fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMessage {
    Response {
        id: serde_json::Value,
        #[serde(default)]
        result: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<serde_json::Value>,
    },
    Event {
        event: String,
        params: serde_json::Value,
    },
}

/// Parse one line of worker stdout into a typed message.
pub fn parse_worker_message(line: &str) -> Option<WorkerMessage> {
    match serde_json::from_str(line.trim()).ok()? {
        RawMessage::Response { id, result, error } => {
            Some(WorkerMessage::Response { id, result, error })
        }
        RawMessage::Event { event, params } => Some(typed_event(event, params)),
    }
}

/// Promote a named event to its typed form.
///
/// Unknown names and params that do not fit the type both land in
/// `UnknownEvent`, keeping the host tolerant of newer workers.
fn typed_event(event: String, params: serde_json::Value) -> WorkerMessage {
    match event.as_str() {
        "worker.ready" => match WorkerReady::deserialize(&params) {
            Ok(ready) => WorkerMessage::Ready(ready),
            Err(_) => WorkerMessage::UnknownEvent { event, params },
        },
        "render.progress" => match RenderProgress::deserialize(&params) {
            Ok(progress) => WorkerMessage::RenderProgress(progress),
            Err(_) => WorkerMessage::UnknownEvent { event, params },
        },
        _ => WorkerMessage::UnknownEvent { event, params },
    }
}
