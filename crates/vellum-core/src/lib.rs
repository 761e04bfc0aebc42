//! # vellum-core - Core Domain Types
//!
//! Shared vocabulary for the Vellum workspace. No I/O beyond the logging
//! bootstrap; the process driver lives in `vellum-render` and the
//! application loop in `vellum-app`.
//!
//! ## Public API
//!
//! ### Documents (`document`)
//! - [`DocumentSource`] - Opaque locator for the document bytes
//! - [`LoadPhase`] - Where a load session stands
//! - [`RenderFailure`] - The two-way failure classification
//!
//! ### Worker protocol (`events`)
//! - [`WorkerMessage`] - Parsed worker stdout messages
//! - [`WorkerEvent`] - Process lifecycle/I/O events
//! - [`WorkerReady`], [`RenderProgress`] - Typed event bodies
//!
//! ### Errors (`error`)
//! - [`Error`], [`Result`], [`ResultExt`]
//!
//! ### Logging (`logging`)
//! - [`logging::init`] - File-based tracing bootstrap (`VELLUM_LOG`)
//!
//! ## Prelude
//!
//! ```rust
//! use vellum_core::prelude::*;
//!
//! fn load() -> Result<()> {
//!     info!("loading");
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod error;
pub mod events;
pub mod logging;

/// Common imports for crates in this workspace
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use document::{DocumentSource, LoadPhase, RenderFailure, PASSWORD_FAILURE_MESSAGE};
pub use error::{Error, Result, ResultExt};
pub use events::{RenderProgress, WorkerEvent, WorkerMessage, WorkerReady};
