//! User status: the shared status type, store keys, and disk persistence
//!
//! The saved status lives in the store under `user.status` and is also
//! persisted as TOML in the data directory so it survives restarts. The
//! draft under `status.draft` is session-scoped and never touches disk.

use std::path::{Path, PathBuf};

use chrono::Local;
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use vellum_core::prelude::*;

/// Store key for the session-scoped draft
pub const DRAFT_KEY: &str = "status.draft";

/// Store key for the saved status
pub const SAVED_KEY: &str = "user.status";

/// File name of the persisted status in the data directory
pub const STATUS_FILE: &str = "status.toml";

/// A user status: an emoji short-code plus free text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    #[serde(default)]
    pub emoji_code: String,
    #[serde(default)]
    pub text: String,
}

impl UserStatus {
    pub fn new(emoji_code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            emoji_code: emoji_code.into(),
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.emoji_code.is_empty() && self.text.is_empty()
    }

    /// Emoji and text joined by a single space, trimmed.
    pub fn display(&self) -> String {
        format!("{} {}", self.emoji_code, self.text).trim().to_string()
    }
}

/// On-disk representation of the saved status
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusRecord {
    #[serde(default)]
    emoji_code: String,
    #[serde(default)]
    text: String,
    /// RFC 3339 timestamp of the last save
    #[serde(default)]
    updated_at: String,
}

/// Resolve the vellum data directory (`~/.local/share/vellum` on Linux).
pub fn default_status_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("vellum"))
}

/// Load the saved status from `dir/status.toml`.
///
/// Missing file means no saved status. A malformed file is logged and
/// treated as absent rather than failing the caller.
pub fn load_status(dir: &Path) -> Option<UserStatus> {
    let path = dir.join(STATUS_FILE);
    if !path.exists() {
        debug!("No status file at {:?}", path);
        return None;
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<StatusRecord>(&content) {
            Ok(record) => {
                let status = UserStatus {
                    emoji_code: record.emoji_code,
                    text: record.text,
                };
                if status.is_empty() {
                    None
                } else {
                    Some(status)
                }
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            None
        }
    }
}

/// Persist the saved status to `dir/status.toml`.
///
/// Takes an exclusive lock on the file so concurrent `vellum status`
/// invocations cannot interleave writes.
pub fn save_status(dir: &Path, status: &UserStatus) -> Result<()> {
    let record = StatusRecord {
        emoji_code: status.emoji_code.clone(),
        text: status.text.clone(),
        updated_at: Local::now().to_rfc3339(),
    };
    let content = toml::to_string_pretty(&record)
        .map_err(|e| Error::status(format!("Failed to serialize status: {}", e)))?;

    std::fs::create_dir_all(dir)
        .map_err(|e| Error::status(format!("Failed to create data directory: {}", e)))?;

    let path = dir.join(STATUS_FILE);
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(|e| Error::status(format!("Failed to open {:?}: {}", path, e)))?;

    file.lock_exclusive()
        .map_err(|e| Error::status(format!("Failed to lock {:?}: {}", path, e)))?;

    use std::io::Write;
    let mut file = file;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::status(format!("Failed to write {:?}: {}", path, e)))?;
    file.flush()
        .map_err(|e| Error::status(format!("Failed to flush {:?}: {}", path, e)))?;

    // Lock is automatically released when file is dropped
    debug!("Saved status to {:?}", path);
    Ok(())
}

/// Remove the persisted status. Missing file is not an error.
pub fn clear_status(dir: &Path) -> Result<()> {
    let path = dir.join(STATUS_FILE);
    match std::fs::remove_file(&path) {
        Ok(()) => {
            debug!("Removed status file {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::status(format!(
            "Failed to remove {:?}: {}",
            path, e
        ))),
    }
}
