//! Document rendering capability
//!
//! `DocumentRenderer` is the seam between the state machine and the render
//! worker: one call per attempt, one classified outcome back. The
//! process-backed implementation sits on top of `CommandSender`; tests
//! substitute scripted renderers.

use std::time::Duration;

use vellum_core::prelude::*;
use vellum_core::{DocumentSource, RenderFailure};
use vellum_render::{CommandSender, WorkerCommand};

/// Outcome of one render attempt, already classified.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub success: bool,
    pub page_count: Option<u32>,
    pub failure: Option<RenderFailure>,
}

impl RenderOutcome {
    pub fn success(page_count: Option<u32>) -> Self {
        Self {
            success: true,
            page_count,
            failure: None,
        }
    }

    /// Classify a failure reason reported by the worker.
    ///
    /// This is the single classification point: reasons containing the
    /// case-insensitive "password" substring become password challenges,
    /// everything else is generic.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            page_count: None,
            failure: Some(RenderFailure::classify(reason)),
        }
    }
}

/// Rendering capability injected into the engine.
///
/// Implementations target the `Send` variant so render attempts can run on
/// spawned tasks; `LocalDocumentRenderer` exists for single-threaded callers.
#[trait_variant::make(DocumentRenderer: Send)]
pub trait LocalDocumentRenderer {
    /// Run one render attempt to completion.
    ///
    /// Render failures come back inside the outcome; an `Err` means the
    /// transport itself broke (worker gone, channel closed, timeout).
    async fn attempt_render(
        &self,
        source: &DocumentSource,
        password: &str,
    ) -> Result<RenderOutcome>;
}

/// Renderer backed by the out-of-process worker.
#[derive(Debug, Clone)]
pub struct WorkerRenderer {
    sender: CommandSender,
    timeout: Duration,
}

impl WorkerRenderer {
    pub fn new(sender: CommandSender, timeout: Duration) -> Self {
        Self { sender, timeout }
    }
}

impl DocumentRenderer for WorkerRenderer {
    async fn attempt_render(
        &self,
        source: &DocumentSource,
        password: &str,
    ) -> Result<RenderOutcome> {
        let command = WorkerCommand::Render {
            source: source.as_str().to_string(),
            password: password.to_string(),
        };

        let response = self.sender.send_with_timeout(command, self.timeout).await?;

        if response.is_success() {
            Ok(RenderOutcome::success(response.page_count()))
        } else {
            let reason = response
                .error
                .unwrap_or_else(|| "Render failed with no reason".to_string());
            Ok(RenderOutcome::failure(reason))
        }
    }
}
