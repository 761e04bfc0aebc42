//! Render worker protocol types
//!
//! Typed bodies for the events a worker emits on stdout, the parsed
//! [`WorkerMessage`] enum, and the low-level [`WorkerEvent`] carried on the
//! process event channel.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Event Payloads
// ─────────────────────────────────────────────────────────────────

/// `worker.ready`: the worker finished starting and accepts requests
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerReady {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub pid: u32,
}

/// `render.progress`: incremental progress for one render request
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderProgress {
    /// Id of the request this progress belongs to
    pub request_id: u64,

    #[serde(default)]
    pub pages_done: u32,

    /// Total page count, once the worker knows it
    #[serde(default)]
    pub page_count: Option<u32>,

    #[serde(default)]
    pub finished: bool,
}

// ─────────────────────────────────────────────────────────────────
// Parsed Messages
// ─────────────────────────────────────────────────────────────────

/// A parsed message from the worker's stdout
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// The worker announced readiness
    Ready(WorkerReady),

    /// Progress on an in-flight render request
    RenderProgress(RenderProgress),

    /// A response to a request we issued
    Response {
        id: serde_json::Value,
        result: Option<serde_json::Value>,
        error: Option<serde_json::Value>,
    },

    /// An event without a typed body (forward compatibility)
    UnknownEvent {
        event: String,
        params: serde_json::Value,
    },
}

impl WorkerMessage {
    /// Whether this message reports a failed request
    pub fn is_error(&self) -> bool {
        matches!(self, WorkerMessage::Response { error: Some(_), .. })
    }

    /// One-line human description for logs
    pub fn summary(&self) -> String {
        match self {
            WorkerMessage::Ready(ready) => {
                format!("Worker ready (version {}, pid {})", ready.version, ready.pid)
            }
            WorkerMessage::RenderProgress(progress) => match progress.page_count {
                Some(total) => format!(
                    "Request {}: {}/{} pages",
                    progress.request_id, progress.pages_done, total
                ),
                None => format!(
                    "Request {}: {} pages done",
                    progress.request_id, progress.pages_done
                ),
            },
            WorkerMessage::Response {
                id,
                error: Some(error),
                ..
            } => format!("Request {} failed: {}", id, error),
            WorkerMessage::Response { id, .. } => format!("Request {} completed", id),
            WorkerMessage::UnknownEvent { event, .. } => format!("Unknown event: {}", event),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Process Events
// ─────────────────────────────────────────────────────────────────

/// Low-level lifecycle and I/O events from the worker process
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A raw line from the worker's stdout (protocol parsing happens upstream)
    Stdout(String),

    /// A raw line from the worker's stderr
    Stderr(String),

    /// The worker process exited
    Exited { code: Option<i32> },
}
