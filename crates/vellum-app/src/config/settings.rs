//! Loading and saving `settings.toml`.

use std::path::{Path, PathBuf};

use super::types::Settings;
use vellum_core::prelude::*;

const SETTINGS_FILENAME: &str = "settings.toml";
const VELLUM_DIR: &str = "vellum";

const SETTINGS_HEADER: &str = "# Vellum configuration\n\n";

/// Resolve the vellum config directory (`~/.config/vellum` on Linux).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(VELLUM_DIR))
}

/// Read settings from `dir/settings.toml`.
///
/// A missing or broken file is not worth dying over this early in
/// startup; both cases fall back to [`Settings::default`] with a log
/// line saying why.
pub fn load_settings(dir: &Path) -> Settings {
    let path = dir.join(SETTINGS_FILENAME);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No {} in {:?}, using defaults", SETTINGS_FILENAME, dir);
            return Settings::default();
        }
        Err(e) => {
            warn!("Could not read {:?}: {}", path, e);
            return Settings::default();
        }
    };

    toml::from_str(&content).unwrap_or_else(|e| {
        warn!("Ignoring unparseable {:?}: {}", path, e);
        Settings::default()
    })
}

/// Write settings to `dir/settings.toml`, creating the directory if needed.
///
/// The file is staged under a dot-name next to its destination and renamed
/// into place, so a crash mid-write never leaves a truncated config behind.
pub fn save_settings(dir: &Path, settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Creating config dir {:?}", dir))?;

    let body = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Settings would not serialize: {}", e)))?;

    let path = dir.join(SETTINGS_FILENAME);
    let staging = dir.join(".settings.toml.tmp");

    std::fs::write(&staging, format!("{SETTINGS_HEADER}{body}"))
        .with_context(|| format!("Staging settings at {:?}", staging))?;
    std::fs::rename(&staging, &path).with_context(|| format!("Replacing {:?}", path))?;

    info!("Saved settings to {:?}", path);
    Ok(())
}
