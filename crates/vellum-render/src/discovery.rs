//! Render worker discovery
//!
//! Resolves the worker executable before spawning. Resolution order:
//! 1. An explicit command (CLI flag or `[worker] command` setting)
//! 2. The `VELLUM_WORKER` environment variable
//! 3. `vellum-worker` on the PATH

use std::path::{Path, PathBuf};

use vellum_core::prelude::*;

/// Environment variable that overrides worker discovery
pub const WORKER_ENV_VAR: &str = "VELLUM_WORKER";

/// Default worker binary name looked up on the PATH
pub const DEFAULT_WORKER_BIN: &str = "vellum-worker";

/// A resolved worker invocation, ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLaunch {
    /// Absolute path to the worker executable
    pub command: PathBuf,
    /// Arguments passed before any protocol traffic
    pub args: Vec<String>,
}

impl WorkerLaunch {
    pub fn new(command: PathBuf, args: Vec<String>) -> Self {
        Self { command, args }
    }

    /// The executable name without its directory, for log lines
    pub fn program_name(&self) -> String {
        self.command
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.command.display().to_string())
    }
}

impl std::fmt::Display for WorkerLaunch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Resolve the worker to launch.
///
/// `override_command` comes from the CLI flag or the settings file and may
/// include arguments ("renderd --machine"). When it is absent, the
/// `VELLUM_WORKER` environment variable is consulted, then the PATH.
pub fn resolve_worker(override_command: Option<&str>) -> Result<WorkerLaunch> {
    if let Some(command) = override_command {
        let trimmed = command.trim();
        if !trimmed.is_empty() {
            debug!("Resolving configured worker command: {}", trimmed);
            return resolve_command_line(trimmed);
        }
    }

    if let Ok(env_command) = std::env::var(WORKER_ENV_VAR) {
        let trimmed = env_command.trim().to_string();
        if !trimmed.is_empty() {
            debug!("Resolving worker from {}: {}", WORKER_ENV_VAR, trimmed);
            return resolve_command_line(&trimmed);
        }
    }

    match which::which(DEFAULT_WORKER_BIN) {
        Ok(path) => Ok(WorkerLaunch::new(normalize(&path), Vec::new())),
        Err(_) => Err(Error::WorkerNotFound),
    }
}

/// Split a command line into program and arguments, then locate the program.
fn resolve_command_line(command_line: &str) -> Result<WorkerLaunch> {
    let mut parts = command_line.split_whitespace();
    let program = match parts.next() {
        Some(p) => p,
        None => return Err(Error::WorkerNotFound),
    };
    let args: Vec<String> = parts.map(|s| s.to_string()).collect();

    let path = locate_program(program)?;
    Ok(WorkerLaunch::new(path, args))
}

/// Locate a program given either a path or a bare name.
fn locate_program(program: &str) -> Result<PathBuf> {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        // Path-like: must exist as given
        if as_path.is_file() {
            return Ok(normalize(as_path));
        }
        warn!("Configured worker path does not exist: {}", program);
        return Err(Error::WorkerNotFound);
    }

    which::which(program)
        .map(|p| normalize(&p))
        .map_err(|_| Error::WorkerNotFound)
}

/// Canonicalize without UNC prefixes on Windows.
fn normalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
