//! Serde-backed settings structures.
//!
//! `Settings` is the user-global configuration loaded from `settings.toml`
//! in the vellum config directory. Every section and field carries a serde
//! default so a partial file (or none at all) still deserializes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application settings (settings.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub behavior: BehaviorSettings,

    #[serde(default)]
    pub worker: WorkerSettings,

    #[serde(default)]
    pub watcher: WatcherSettings,
}

/// Session behavior knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BehaviorSettings {
    /// Per-attempt render timeout in seconds
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,
}

impl BehaviorSettings {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            render_timeout_secs: default_render_timeout_secs(),
        }
    }
}

fn default_render_timeout_secs() -> u64 {
    30
}

/// Render worker settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkerSettings {
    /// Worker command; `None` falls back to VELLUM_WORKER, then PATH
    #[serde(default)]
    pub command: Option<String>,

    /// Extra arguments passed to the worker
    #[serde(default)]
    pub args: Vec<String>,
}

/// Source watcher settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherSettings {
    /// Watch the opened document for external changes
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long to coalesce a burst of change events, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}
