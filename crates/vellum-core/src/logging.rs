//! File-based tracing setup.
//!
//! Vellum logs to a daily-rolling file rather than the terminal so the
//! interactive password prompt stays clean. `VELLUM_LOG` takes the usual
//! `EnvFilter` directives, e.g. `VELLUM_LOG=vellum_app=trace`.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "VELLUM_LOG";

/// Info for the vellum crates, warnings from everything else.
const DEFAULT_FILTER: &str =
    "vellum=info,vellum_core=info,vellum_render=info,vellum_app=info,warn";

/// Directory the rolling log files land in.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vellum")
        .join("logs")
}

/// Install the global tracing subscriber.
///
/// Writes dated `vellum.log` files under [`log_dir`], one per day, ANSI
/// stripped. Fails only when the log directory cannot be created.
pub fn init() -> Result<()> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let writer = RollingFileAppender::new(Rotation::DAILY, &dir, "vellum.log");

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!(
        "vellum {} logging to {}",
        env!("CARGO_PKG_VERSION"),
        dir.display()
    );

    Ok(())
}
