//! # vellum-render - the render worker, as seen from the host
//!
//! Manages the render worker child process, line-delimited JSON
//! communication, and worker discovery.
//!
//! Depends on [`vellum_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Worker Process
//! - [`WorkerProcess`] - Spawn and manage a render worker child process
//! - [`CommandSender`] - Send requests to a running worker
//! - [`RequestTracker`] - Match responses back to waiting requests
//!
//! ### Wire Protocol
//! - [`parse_worker_message()`] - Parse a line of worker stdout
//! - [`WorkerCommand`] - Requests the host can send
//!
//! ### Worker Discovery
//! - [`resolve_worker()`] - Locate the worker executable
//! - [`WorkerLaunch`] - A resolved worker invocation

pub mod commands;
pub mod discovery;
pub mod process;
pub mod protocol;

// Public API re-exports
pub use commands::{
    next_request_id, CommandResponse, CommandSender, RequestTracker, WorkerCommand,
};
pub use discovery::{resolve_worker, WorkerLaunch, DEFAULT_WORKER_BIN, WORKER_ENV_VAR};
pub use process::WorkerProcess;
pub use protocol::parse_worker_message;
/// Re-exported from `vellum_core` for convenience. Canonical import: `vellum_core::WorkerMessage`.
pub use vellum_core::WorkerMessage;
