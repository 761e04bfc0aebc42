//! Load-complete notification sink
//!
//! The surface embedding a document gets a single callback when the
//! document first renders. `LoadCompleteSink` is that seam; the engine
//! calls it at most once per session, on the first successful load.

use vellum_core::prelude::*;

/// Receives the once-per-session load-complete notification.
#[cfg_attr(test, mockall::automock)]
pub trait LoadCompleteSink: Send + Sync {
    fn notify_load_complete(&self);
}

/// Default sink: logs the notification. Subscribers get the same signal
/// as an engine event, so most embedders never replace this.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl LoadCompleteSink for LoggingSink {
    fn notify_load_complete(&self) {
        info!("Document load complete");
    }
}
