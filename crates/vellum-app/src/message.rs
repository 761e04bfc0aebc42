//! The message alphabet the engine loop consumes (TEA pattern)

use serde_json::Value;

use vellum_core::{DocumentSource, RenderFailure, RenderProgress, WorkerReady};

/// Everything that can happen to the application, as one enum
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Document Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Open a document, optionally with an initial password
    OpenDocument {
        source: DocumentSource,
        password: Option<String>,
    },

    /// User submitted a password from the prompt
    SubmitPassword(String),

    /// User edited the password field (clears the invalid highlight)
    PasswordEdited,

    /// A render attempt completed successfully
    RenderSucceeded {
        attempt: u64,
        page_count: Option<u32>,
    },

    /// A render attempt failed with a classified reason
    RenderFailed { attempt: u64, failure: RenderFailure },

    /// Progress report from the worker for an in-flight render
    RenderProgress(RenderProgress),

    // ─────────────────────────────────────────────────────────
    // Worker Lifecycle
    // ─────────────────────────────────────────────────────────
    /// The worker announced itself on stdout
    WorkerReady(WorkerReady),

    /// The worker process exited
    WorkerExited { code: Option<i32> },

    // ─────────────────────────────────────────────────────────
    // Source Watcher
    // ─────────────────────────────────────────────────────────
    /// The watched source file changed on disk (debounced)
    SourceChanged,

    /// Watcher error occurred
    WatcherError { message: String },

    // ─────────────────────────────────────────────────────────
    // User Status
    // ─────────────────────────────────────────────────────────
    /// Update the session-scoped status draft
    EditStatusDraft { emoji_code: String, text: String },

    /// Commit the effective status and clear the draft
    SaveStatus,

    /// Remove both the saved status and the draft
    ClearStatus,

    /// A store key changed (bridged from store subscriptions)
    StoreChanged { key: String, value: Option<Value> },

    // ─────────────────────────────────────────────────────────
    // Control
    // ─────────────────────────────────────────────────────────
    /// Quit the event loop
    Quit,
}
