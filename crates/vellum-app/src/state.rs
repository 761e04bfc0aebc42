//! Application state (Model in TEA pattern)

use std::sync::atomic::{AtomicU64, Ordering};

use vellum_core::{DocumentSource, LoadPhase, RenderFailure, RenderProgress, WorkerReady};

use crate::status::UserStatus;

/// Global attempt counter
static ATTEMPT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocate the next render attempt number
fn next_attempt() -> u64 {
    ATTEMPT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// State of the document load session.
///
/// Created when a document is opened, mutated only by the update handlers,
/// discarded when the session ends.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLoadState {
    /// Locator for the document bytes. Opaque to the state machine; only
    /// the CLI and the watcher inspect it.
    pub source: DocumentSource,

    /// Last password submitted by the user. Empty until one is submitted.
    pub current_password: String,

    /// Current phase of the load state machine.
    pub phase: LoadPhase,

    /// True only after a submitted non-empty password has been rejected.
    ///
    /// Invariant: may be true only while `phase == AwaitingPassword` and
    /// `current_password` is non-empty.
    pub password_known_invalid: bool,

    /// True from the first password challenge until the load resolves.
    ///
    /// Stays true across the validating attempt after a submission, so the
    /// prompt can remain on screen with a busy indicator instead of
    /// flickering away and back.
    pub challenge_active: bool,

    /// Sequence number of the active render attempt. Outcome messages
    /// carrying any other number are stale and ignored.
    pub attempt: u64,

    /// Latch: the load-complete notification fires once per session.
    pub load_complete_sent: bool,

    /// Classified failure retained for display after entering `Failed`.
    pub failure: Option<RenderFailure>,

    /// Pages rendered so far, from worker progress events.
    pub pages_done: u32,

    /// Total page count once known.
    pub page_count: Option<u32>,

    /// Highest progress request id seen. Request ids are process-wide and
    /// monotonic, so progress from superseded requests sorts below this.
    last_progress_request: u64,
}

impl DocumentLoadState {
    pub fn new(source: DocumentSource, password: Option<String>) -> Self {
        Self {
            source,
            current_password: password.unwrap_or_default(),
            phase: LoadPhase::Loading,
            password_known_invalid: false,
            challenge_active: false,
            attempt: 0,
            load_complete_sent: false,
            failure: None,
            pages_done: 0,
            page_count: None,
            last_progress_request: 0,
        }
    }

    /// Start a fresh render attempt. Returns the new attempt number.
    ///
    /// Resets the transient per-attempt fields and moves to `Loading`.
    pub fn begin_attempt(&mut self) -> u64 {
        self.attempt = next_attempt();
        self.phase = LoadPhase::Loading;
        self.password_known_invalid = false;
        self.failure = None;
        self.pages_done = 0;
        self.page_count = None;
        self.attempt
    }

    /// Whether an outcome for `attempt` belongs to the active attempt.
    pub fn is_current(&self, attempt: u64) -> bool {
        self.attempt == attempt
    }

    /// Enter `AwaitingPassword` after a password failure.
    ///
    /// The invalid flag is inferred from local history: it is set exactly
    /// when a non-empty password was submitted for the failed attempt.
    pub fn enter_awaiting_password(&mut self) {
        self.phase = LoadPhase::AwaitingPassword;
        self.challenge_active = true;
        self.password_known_invalid = !self.current_password.is_empty();
    }

    /// Enter `Loaded`. Returns true when this is the session's first
    /// success, i.e. the load-complete notification should fire.
    pub fn enter_loaded(&mut self, page_count: Option<u32>) -> bool {
        self.phase = LoadPhase::Loaded;
        self.challenge_active = false;
        self.password_known_invalid = false;
        self.failure = None;
        if page_count.is_some() {
            self.page_count = page_count;
        }
        if self.load_complete_sent {
            false
        } else {
            self.load_complete_sent = true;
            true
        }
    }

    /// Enter `Failed` with a classified reason. Terminal.
    pub fn enter_failed(&mut self, failure: RenderFailure) {
        self.phase = LoadPhase::Failed;
        self.challenge_active = false;
        self.password_known_invalid = false;
        self.failure = Some(failure);
    }

    /// Store a newly submitted password.
    pub fn set_password(&mut self, password: String) {
        self.current_password = password;
    }

    /// Clear the invalid highlight (user is typing a new password).
    pub fn clear_invalid_flag(&mut self) {
        self.password_known_invalid = false;
    }

    /// Record a worker progress event.
    ///
    /// Returns false when the event should be ignored: the load is not in
    /// flight, or the event belongs to a superseded request. Correlation is
    /// best-effort and affects display only.
    pub fn record_progress(&mut self, progress: &RenderProgress) -> bool {
        if self.phase != LoadPhase::Loading {
            return false;
        }
        if progress.request_id < self.last_progress_request {
            return false;
        }
        self.last_progress_request = progress.request_id;
        self.pages_done = progress.pages_done;
        if progress.page_count.is_some() {
            self.page_count = progress.page_count;
        }
        true
    }
}

/// Mirror of the status draft and saved status from the store.
///
/// Kept in sync by `StoreChanged` messages so the resolution rules stay
/// pure functions over state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusState {
    /// Session-scoped unsaved edits (`status.draft` key).
    pub draft: Option<UserStatus>,
    /// Saved status (`user.status` key, persisted to disk).
    pub saved: Option<UserStatus>,
}

impl StatusState {
    fn draft_emoji(&self) -> &str {
        self.draft.as_ref().map(|d| d.emoji_code.as_str()).unwrap_or("")
    }

    fn draft_text(&self) -> &str {
        self.draft.as_ref().map(|d| d.text.as_str()).unwrap_or("")
    }

    fn saved_emoji(&self) -> &str {
        self.saved.as_ref().map(|s| s.emoji_code.as_str()).unwrap_or("")
    }

    fn saved_text(&self) -> &str {
        self.saved.as_ref().map(|s| s.text.as_str()).unwrap_or("")
    }

    /// Draft emoji when set, else the saved emoji.
    pub fn effective_emoji(&self) -> &str {
        let draft = self.draft_emoji();
        if draft.is_empty() {
            self.saved_emoji()
        } else {
            draft
        }
    }

    /// Draft text when the draft emoji is set, else the saved text.
    pub fn effective_text(&self) -> &str {
        if self.draft_emoji().is_empty() {
            self.saved_text()
        } else {
            self.draft_text()
        }
    }

    /// Whether there are unsaved edits. Gates the save operation.
    pub fn has_draft(&self) -> bool {
        !self.draft_emoji().is_empty() || !self.draft_text().is_empty()
    }

    /// The effective status as a user-facing display string.
    pub fn display(&self) -> String {
        format!("{} {}", self.effective_emoji(), self.effective_text())
            .trim()
            .to_string()
    }

    /// The pair a save operation commits.
    pub fn effective_status(&self) -> UserStatus {
        UserStatus {
            emoji_code: self.effective_emoji().to_string(),
            text: self.effective_text().to_string(),
        }
    }
}

/// TEA application state (the Model)
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Document load session. None until a document is opened.
    pub document: Option<DocumentLoadState>,

    /// Status draft/saved mirror.
    pub status: StatusState,

    /// Worker identity once it has announced itself. None before the
    /// ready event and after an exit.
    pub worker: Option<WorkerReady>,

    /// Set by `Message::Quit`; the event loop exits when true.
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active document load session, if a document has been opened.
    pub fn document(&self) -> Option<&DocumentLoadState> {
        self.document.as_ref()
    }

    /// Current load phase, if a document has been opened.
    pub fn phase(&self) -> Option<LoadPhase> {
        self.document.as_ref().map(|d| d.phase)
    }
}
