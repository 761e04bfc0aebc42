//! vellum-app - engine, state machine, and orchestration glue.
//!
//! Everything between the CLI and the render worker lives here: the TEA
//! (The Elm Architecture) update loop for the document load flow, the
//! [`Engine`] that drives it, the reactive key-value store, settings,
//! and the source watcher.

pub mod actions;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod handler;
pub mod message;
pub mod process;
pub mod renderer;
pub mod sink;
pub mod state;
pub mod status;
pub mod store;
pub mod view;
pub mod watcher;

// Flat re-exports for callers
pub use config::{load_settings, save_settings, Settings};
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{update, UpdateAction, UpdateResult};
pub use message::Message;
pub use renderer::{DocumentRenderer, RenderOutcome, WorkerRenderer};
pub use sink::{LoadCompleteSink, LoggingSink};
pub use state::{AppState, DocumentLoadState, StatusState};
pub use status::UserStatus;
pub use store::{KeyValueStore, MemoryStore, StoreChange};
pub use view::{view_policy, PromptProps, SurfaceVisibility, ViewPolicy};
