//! Source file watcher for auto-reload.
//!
//! Watches the opened document on disk and reports debounced changes as
//! [`Message::SourceChanged`]. Editors often replace a file by renaming a
//! temporary over it, which invalidates a direct file watch, so the watcher
//! observes the parent directory non-recursively and filters events down to
//! the document's file name.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::message::Message;

/// Default debounce duration in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Configuration for the source watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl WatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set debounce duration in milliseconds
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce = Duration::from_millis(ms);
        self
    }
}

/// Watches one document file for external changes.
pub struct SourceWatcher {
    path: PathBuf,
    config: WatcherConfig,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl SourceWatcher {
    pub fn new(path: PathBuf, config: WatcherConfig) -> Self {
        Self {
            path,
            config,
            stop_tx: None,
        }
    }

    /// Start watching on a blocking task.
    ///
    /// Changes arrive as `Message::SourceChanged`; watcher failures as
    /// `Message::WatcherError`.
    pub fn start(&mut self, message_tx: mpsc::Sender<Message>) -> Result<(), String> {
        if self.is_running() {
            return Err("Watcher is already running".to_string());
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let path = self.path.clone();
        let debounce = self.config.debounce;
        tokio::task::spawn_blocking(move || {
            if let Err(message) = watch_until_stopped(&path, debounce, &message_tx, stop_rx) {
                error!("Source watcher failed: {}", message);
                let _ = message_tx.blocking_send(Message::WatcherError { message });
            }
        });

        Ok(())
    }

    /// Stop the watcher task.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Set up the debounced directory watch and hold it until stopped.
///
/// Setup failures come back as the error string; failures after setup are
/// reported through the channel by the debouncer callback.
fn watch_until_stopped(
    path: &Path,
    debounce: Duration,
    message_tx: &mpsc::Sender<Message>,
    stop_rx: oneshot::Receiver<()>,
) -> Result<(), String> {
    let file_name: OsString = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| format!("Cannot watch {}: no file name", path.display()))?;
    let watch_dir = parent_dir(path);

    if !watch_dir.exists() {
        return Err(format!(
            "Watch directory does not exist: {}",
            watch_dir.display()
        ));
    }

    let events_tx = message_tx.clone();
    let mut debouncer = new_debouncer(debounce, None, move |outcome: DebounceEventResult| {
        match outcome {
            Ok(events) => {
                let changed = events.iter().flat_map(|event| event.paths.iter());
                if is_document_change(changed, &file_name) {
                    debug!("Watched document changed on disk");
                    let _ = events_tx.blocking_send(Message::SourceChanged);
                }
            }
            Err(errors) => {
                for e in errors {
                    warn!("Source watcher error: {:?}", e);
                    let _ = events_tx.blocking_send(Message::WatcherError {
                        message: e.to_string(),
                    });
                }
            }
        }
    })
    .map_err(|e| format!("Failed to create watcher: {}", e))?;

    debouncer
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| format!("Failed to watch {}: {}", watch_dir.display(), e))?;

    info!("Watching {} for changes", path.display());

    // Park until stopped; a dropped sender counts as a stop.
    let _ = stop_rx.blocking_recv();
    info!("Source watcher stopped");
    Ok(())
}

/// The directory whose entries the watch must cover.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// True when any changed path names the watched document.
fn is_document_change<'a>(
    mut changed: impl Iterator<Item = &'a PathBuf>,
    file_name: &OsStr,
) -> bool {
    changed.any(|p| p.file_name() == Some(file_name))
}
