//! Worker requests and response routing.
//!
//! Every request line carries a process-unique id. [`RequestTracker`] keeps
//! one oneshot responder per in-flight id; the host's reader loop feeds
//! decoded responses into [`RequestTracker::handle_response`], which wakes
//! the matching [`CommandSender::send_with_timeout`] call. Requests that
//! never get an answer are removed again when their timeout fires, so the
//! pending map cannot grow past the number of live callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};

use vellum_core::prelude::*;

/// Timeout applied by [`CommandSender::send`].
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Next process-unique request id.
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// One in-flight request waiting for its response line.
#[derive(Debug)]
struct Pending {
    responder: oneshot::Sender<CommandResponse>,
    label: &'static str,
}

/// Decoded response to a worker request.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl CommandResponse {
    /// Build a response from the raw wire fields.
    pub fn from_wire(id: u64, result: Option<Value>, error: Option<Value>) -> Self {
        Self {
            id,
            result,
            // Error payloads are plain strings on the wire; as_str avoids
            // quoting them a second time.
            error: error.map(|e| match e.as_str() {
                Some(s) => s.to_string(),
                None => e.to_string(),
            }),
        }
    }

    /// A response without an error field is a success.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Page count from a successful render response, if the worker reported one.
    pub fn page_count(&self) -> Option<u32> {
        self.result
            .as_ref()
            .and_then(|r| r.get("pageCount"))
            .and_then(|v| v.as_u64())
            .map(|n| n as u32)
    }
}

/// Matches worker response lines to the callers waiting on them.
#[derive(Debug, Default)]
pub struct RequestTracker {
    pending: Mutex<HashMap<u64, Pending>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and a receiver for its eventual response.
    pub async fn register(&self, label: &'static str) -> (u64, oneshot::Receiver<CommandResponse>) {
        let id = next_request_id();
        let (responder, rx) = oneshot::channel();
        self.pending
            .lock()
            .await
            .insert(id, Pending { responder, label });
        (id, rx)
    }

    /// Route a response to the caller that sent request `id`.
    ///
    /// Returns false when no such request is pending, so the caller can
    /// report the orphaned id.
    pub async fn handle_response(
        &self,
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    ) -> bool {
        match self.pending.lock().await.remove(&id) {
            Some(pending) => {
                let _ = pending
                    .responder
                    .send(CommandResponse::from_wire(id, result, error));
                true
            }
            None => false,
        }
    }

    /// Drop request `id` without answering it.
    ///
    /// Used when the caller has given up waiting; returns whether the
    /// request was still pending.
    pub async fn forget(&self, id: u64) -> bool {
        match self.pending.lock().await.remove(&id) {
            Some(pending) => {
                debug!("Dropping request #{} ({})", id, pending.label);
                true
            }
            None => false,
        }
    }

    /// Fail every pending request, e.g. when the worker dies.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        if !pending.is_empty() {
            debug!("Cancelling {} pending request(s)", pending.len());
        }
        for (id, entry) in pending.drain() {
            let _ = entry.responder.send(CommandResponse {
                id,
                result: None,
                error: Some("Request cancelled".to_string()),
            });
        }
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Render worker request types.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Render a document, optionally decrypting it with a password.
    Render { source: String, password: String },
    /// Ask the worker to exit.
    Shutdown,
}

impl WorkerCommand {
    /// Serialized request line for this command.
    pub fn build(&self, id: u64) -> String {
        let request = match self {
            WorkerCommand::Render { source, password } => json!({
                "id": id,
                "method": "document.render",
                "params": { "source": source, "password": password },
            }),
            // Shutdown carries no parameters, so the key is omitted.
            WorkerCommand::Shutdown => json!({ "id": id, "method": "worker.shutdown" }),
        };
        request.to_string()
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            WorkerCommand::Render { .. } => "render document",
            WorkerCommand::Shutdown => "shutdown worker",
        }
    }
}

/// Sends requests down the worker's stdin and waits for tracked responses.
#[derive(Debug, Clone)]
pub struct CommandSender {
    stdin_tx: mpsc::Sender<String>,
    tracker: Arc<RequestTracker>,
}

impl CommandSender {
    pub fn new(stdin_tx: mpsc::Sender<String>, tracker: Arc<RequestTracker>) -> Self {
        Self { stdin_tx, tracker }
    }

    /// Sender wired to a visible stdin channel, for tests that play the
    /// worker end of the pipe.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn new_with_channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let sender = Self {
            stdin_tx: tx,
            tracker: Arc::new(RequestTracker::default()),
        };
        (sender, rx)
    }

    /// Send a request and wait for its response with the default timeout.
    pub async fn send(&self, command: WorkerCommand) -> Result<CommandResponse> {
        self.send_with_timeout(command, DEFAULT_REQUEST_TIMEOUT)
            .await
    }

    /// Send a request and wait for its response.
    ///
    /// On timeout the pending entry is dropped, so a late response line is
    /// reported as orphaned rather than delivered to a vanished caller.
    pub async fn send_with_timeout(
        &self,
        command: WorkerCommand,
        timeout: Duration,
    ) -> Result<CommandResponse> {
        let (id, response_rx) = self.tracker.register(command.label()).await;

        debug!("Sending request #{}: {}", id, command.label());

        if self.stdin_tx.send(command.build(id)).await.is_err() {
            self.tracker.forget(id).await;
            return Err(Error::channel_send("worker stdin"));
        }

        match tokio::time::timeout(timeout, response_rx).await {
            Ok(Ok(response)) => {
                debug!(
                    "Request #{} completed: success={}",
                    id,
                    response.is_success()
                );
                Ok(response)
            }
            // The tracker dropped the entry without answering.
            Ok(Err(_)) => Err(Error::process("Request dropped without a response")),
            Err(_) => {
                self.tracker.forget(id).await;
                Err(Error::process(format!(
                    "Request '{}' timed out after {:?}",
                    command.label(),
                    timeout
                )))
            }
        }
    }

    /// The tracker responses must be routed into.
    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique_and_increasing() {
        let a = next_request_id();
        let b = next_request_id();
        let c = next_request_id();

        assert!(a < b);
        assert!(b < c);
    }

    #[tokio::test]
    async fn test_register_tracks_pending() {
        let tracker = RequestTracker::new();

        let (first, _rx1) = tracker.register("one").await;
        let (second, _rx2) = tracker.register("two").await;

        assert_ne!(first, second);
        assert_eq!(tracker.pending_count().await, 2);
    }

    #[tokio::test]
    async fn test_matched_response_wakes_waiter() {
        let tracker = RequestTracker::new();
        let (id, rx) = tracker.register("render").await;

        let matched = tracker
            .handle_response(id, Some(json!({"pageCount": 6})), None)
            .await;
        assert!(matched);
        assert_eq!(tracker.pending_count().await, 0);

        let response = rx.await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.page_count(), Some(6));
    }

    #[tokio::test]
    async fn test_unmatched_response_is_reported() {
        let tracker = RequestTracker::new();

        let matched = tracker.handle_response(404, Some(json!({})), None).await;
        assert!(!matched);
    }

    #[tokio::test]
    async fn test_forget_drops_without_answering() {
        let tracker = RequestTracker::new();
        let (id, rx) = tracker.register("render").await;

        assert!(tracker.forget(id).await);
        assert!(!tracker.forget(id).await);
        assert_eq!(tracker.pending_count().await, 0);

        // The waiter sees a closed channel, not a response.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_all_fails_every_waiter() {
        let tracker = RequestTracker::new();
        let (_, rx1) = tracker.register("one").await;
        let (_, rx2) = tracker.register("two").await;

        tracker.cancel_all().await;
        assert_eq!(tracker.pending_count().await, 0);

        for rx in [rx1, rx2] {
            let response = rx.await.unwrap();
            assert!(!response.is_success());
            assert!(response.error.as_ref().unwrap().contains("cancelled"));
        }
    }

    #[test]
    fn test_string_error_payload_is_unquoted() {
        let response = CommandResponse::from_wire(2, None, Some(json!("decode error")));
        assert!(!response.is_success());
        assert_eq!(response.error, Some("decode error".to_string()));
    }

    #[test]
    fn test_structured_error_payload_is_serialized() {
        let response = CommandResponse::from_wire(3, None, Some(json!({"code": 7})));
        assert_eq!(response.error, Some(r#"{"code":7}"#.to_string()));
    }

    #[test]
    fn test_page_count_extraction() {
        let with_count = CommandResponse::from_wire(1, Some(json!({"pageCount": 9})), None);
        assert!(with_count.is_success());
        assert_eq!(with_count.page_count(), Some(9));

        let without_count = CommandResponse::from_wire(2, Some(json!({})), None);
        assert_eq!(without_count.page_count(), None);

        let without_result = CommandResponse::from_wire(3, None, None);
        assert_eq!(without_result.page_count(), None);
    }

    #[test]
    fn test_render_request_line() {
        let line = WorkerCommand::Render {
            source: "docs/report.pdf".to_string(),
            password: "hunter2".to_string(),
        }
        .build(1);

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["method"], "document.render");
        assert_eq!(parsed["params"]["source"], "docs/report.pdf");
        assert_eq!(parsed["params"]["password"], "hunter2");
    }

    #[test]
    fn test_render_request_keeps_empty_password() {
        let line = WorkerCommand::Render {
            source: "a.pdf".to_string(),
            password: String::new(),
        }
        .build(3);

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["params"]["password"], "");
    }

    #[test]
    fn test_shutdown_request_has_no_params() {
        let line = WorkerCommand::Shutdown.build(8);

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["id"], 8);
        assert_eq!(parsed["method"], "worker.shutdown");
        assert!(parsed.get("params").is_none());
    }

    #[test]
    fn test_labels() {
        let render = WorkerCommand::Render {
            source: "x".into(),
            password: "".into(),
        };
        assert_eq!(render.label(), "render document");
        assert_eq!(WorkerCommand::Shutdown.label(), "shutdown worker");
    }

    #[tokio::test]
    async fn test_sender_resolves_tracked_response() {
        let (sender, mut stdin_rx) = CommandSender::new_with_channel(8);
        let tracker = sender.tracker().clone();

        // Play the worker: answer the first request line by id.
        tokio::spawn(async move {
            if let Some(line) = stdin_rx.recv().await {
                let parsed: Value = serde_json::from_str(&line).unwrap();
                let id = parsed["id"].as_u64().unwrap();
                tracker
                    .handle_response(id, Some(json!({"pageCount": 3})), None)
                    .await;
            }
        });

        let response = sender
            .send(WorkerCommand::Render {
                source: "a.pdf".into(),
                password: "".into(),
            })
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.page_count(), Some(3));
    }

    #[tokio::test]
    async fn test_sender_timeout_clears_pending() {
        let (sender, _stdin_rx) = CommandSender::new_with_channel(8);

        // No responder, so the request can only time out.
        let result = sender
            .send_with_timeout(WorkerCommand::Shutdown, Duration::from_millis(10))
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timed out"));
        assert_eq!(sender.tracker().pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_sender_stdin_closed() {
        let (sender, stdin_rx) = CommandSender::new_with_channel(1);
        drop(stdin_rx);

        let result = sender.send(WorkerCommand::Shutdown).await;

        assert!(result.is_err());
        // The failed dispatch must not leave a pending entry behind.
        assert_eq!(sender.tracker().pending_count().await, 0);
    }
}
