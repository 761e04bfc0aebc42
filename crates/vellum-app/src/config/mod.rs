//! Configuration for Vellum
//!
//! `settings.toml` in the user config directory holds the worker command,
//! the render timeout, and watcher preferences.

pub mod settings;
pub mod types;

pub use settings::{default_config_dir, load_settings, save_settings};
pub use types::{BehaviorSettings, Settings, WatcherSettings, WorkerSettings};
