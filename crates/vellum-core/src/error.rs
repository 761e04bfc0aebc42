//! The workspace error type.
//!
//! One enum for the whole workspace, grouped by where the failure comes
//! from: the render worker, persisted files, or plumbing. Fatal errors end
//! the session; recoverable ones are reported and absorbed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Render worker
    #[error("Render worker not found. Configure [worker] command, set VELLUM_WORKER, or put 'vellum-worker' in your PATH.")]
    WorkerNotFound,

    #[error("Failed to spawn render worker: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Render worker exited early (code {code:?})")]
    ProcessExit { code: Option<i32> },

    #[error("Render worker error: {message}")]
    Process { message: String },

    // Persisted files
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Status persistence error: {message}")]
    Status { message: String },

    // Plumbing
    #[error("Channel send failed: {message}")]
    ChannelSend { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Errors a running session absorbs and reports rather than dying on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Process { .. } | Error::ChannelSend { .. } | Error::Status { .. }
        )
    }

    /// Errors there is no session to continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::WorkerNotFound | Error::ProcessSpawn { .. } | Error::ProcessExit { .. }
        )
    }
}

/// Attach context to an error result, logging it as it passes through.
///
/// The error keeps its variant; the context only goes to the log. This is
/// the tracing-side counterpart of what color-eyre does at the CLI surface.
pub trait ResultExt<T>: Sized {
    /// Attach lazily-built context.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Attach fixed context.
    fn context(self, message: impl Into<String>) -> Result<T> {
        let message = message.into();
        self.with_context(move || message)
    }
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
