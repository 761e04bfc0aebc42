//! Events broadcast by the engine after each message it processes.
//!
//! `EngineEvent` is the one-way notification stream from the engine to
//! attached frontends (the CLI runner today, a GUI later). Frontends
//! subscribe via `Engine::subscribe()`; nothing flows back on this
//! channel.

use crate::status::UserStatus;
use vellum_core::{LoadPhase, RenderFailure};

/// A state change worth announcing to frontends.
///
/// Emitted only after the update cycle that caused it has finished, so a
/// subscriber that queries the engine on receipt sees the settled state,
/// never a half-applied one.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Document Lifecycle
    // ─────────────────────────────────────────────────────────
    /// The load phase moved between two concrete phases.
    PhaseChanged {
        old_phase: LoadPhase,
        new_phase: LoadPhase,
        /// Failure that drove the transition, when there was one.
        failure: Option<RenderFailure>,
    },

    /// First successful load of the session. Fires at most once.
    LoadCompleted,

    /// Incremental progress for the render attempt in flight.
    RenderProgress {
        pages_done: u32,
        page_count: Option<u32>,
    },

    // ─────────────────────────────────────────────────────────
    // Worker Lifecycle
    // ─────────────────────────────────────────────────────────
    /// The render worker announced itself on stdout.
    WorkerReady { version: String, pid: u32 },

    /// The render worker process is gone.
    WorkerExited { code: Option<i32> },

    // ─────────────────────────────────────────────────────────
    // User Status
    // ─────────────────────────────────────────────────────────
    /// A status was written to the store.
    StatusSaved { status: UserStatus },

    /// The stored status was removed.
    StatusCleared,

    // ─────────────────────────────────────────────────────────
    // Source Watcher
    // ─────────────────────────────────────────────────────────
    /// The watched source file changed on disk.
    SourceChanged,

    /// The watcher hit a problem it could survive.
    WatcherError { message: String },

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    /// The engine is tearing down; no further events follow.
    Shutdown,
}

impl EngineEvent {
    /// Short snake_case label for log lines and assertions.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
            Self::LoadCompleted => "load_completed",
            Self::RenderProgress { .. } => "render_progress",
            Self::WorkerReady { .. } => "worker_ready",
            Self::WorkerExited { .. } => "worker_exited",
            Self::StatusSaved { .. } => "status_saved",
            Self::StatusCleared => "status_cleared",
            Self::SourceChanged => "source_changed",
            Self::WatcherError { .. } => "watcher_error",
            Self::Shutdown => "shutdown",
        }
    }
}
