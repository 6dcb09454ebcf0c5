//! The always-run epilogue: best-effort cleanup and the single status
//! notification.

use super::Action;
use crate::context::RunContext;
use std::sync::Arc;
use tracing::{debug, warn};

/// One named, best-effort finalization step.
pub struct FinalizerStep {
    /// Step name, used in logs.
    pub name: String,
    /// The step body.
    pub action: Arc<dyn Action>,
}

impl std::fmt::Debug for FinalizerStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizerStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Runs exactly once per run, on every exit path.
///
/// Order: cleanup steps (artifact removal, prune, auxiliary checkout
/// removal), then the status notification, then workspace release. Each
/// part is individually best-effort: a failure is logged and swallowed,
/// and never produces a second failure signal for the run.
#[derive(Debug, Default)]
pub struct Finalizer {
    cleanup: Vec<FinalizerStep>,
    notify: Option<FinalizerStep>,
    release: Option<FinalizerStep>,
}

impl Finalizer {
    /// Creates an empty finalizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cleanup step.
    #[must_use]
    pub fn with_cleanup(mut self, name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.cleanup.push(FinalizerStep {
            name: name.into(),
            action,
        });
        self
    }

    /// Sets the notification step, run after cleanup.
    ///
    /// The action is expected to emit exactly one message describing the
    /// run's final result; delivery failure is swallowed here.
    #[must_use]
    pub fn with_notify(mut self, action: Arc<dyn Action>) -> Self {
        self.notify = Some(FinalizerStep {
            name: "notify".to_string(),
            action,
        });
        self
    }

    /// Sets the workspace release step, run last.
    #[must_use]
    pub fn with_release(mut self, name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.release = Some(FinalizerStep {
            name: name.into(),
            action,
        });
        self
    }

    /// Runs every step. Never fails.
    pub async fn finalize(&self, ctx: &RunContext) {
        debug!(run = %ctx.id(), result = %ctx.final_result(), "finalizing run");

        for step in &self.cleanup {
            Self::run_step(step, ctx).await;
        }
        if let Some(step) = &self.notify {
            Self::run_step(step, ctx).await;
        }
        if let Some(step) = &self.release {
            Self::run_step(step, ctx).await;
        }
    }

    async fn run_step(step: &FinalizerStep, ctx: &RunContext) {
        if let Err(e) = step.action.run(ctx).await {
            warn!(step = %step.name, error = %e, "finalizer step failed");
        }
    }
}
