//! The stage sequencer: fixed-order, halt-on-first-failure execution.

use super::{Action, GuardedAction, RunCondition};
use crate::context::RunContext;
use crate::core::RunResult;
use crate::errors::StageError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A named, conditionally-executed unit of pipeline work.
///
/// Stages are statically defined per pipeline, not created per run. The
/// body is an ordered sequence of guarded actions executed front to back;
/// the optional post-action runs best-effort regardless of body outcome.
pub struct StageDef {
    /// Stage name.
    pub name: String,
    /// Run-condition evaluated before the body starts.
    pub condition: RunCondition,
    /// Ordered body actions.
    pub body: Vec<GuardedAction>,
    /// Best-effort post-action (e.g. artifact archival).
    pub post: Option<(String, Arc<dyn Action>)>,
}

impl StageDef {
    /// Creates a stage with an empty body.
    #[must_use]
    pub fn new(name: impl Into<String>, condition: RunCondition) -> Self {
        Self {
            name: name.into(),
            condition,
            body: Vec::new(),
            post: None,
        }
    }

    /// Appends a body action.
    #[must_use]
    pub fn action(mut self, action: GuardedAction) -> Self {
        self.body.push(action);
        self
    }

    /// Declares the best-effort post-action.
    #[must_use]
    pub fn with_post(mut self, name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.post = Some((name.into(), action));
        self
    }
}

impl std::fmt::Debug for StageDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDef")
            .field("name", &self.name)
            .field("condition", &self.condition)
            .field("actions", &self.body.len())
            .field("has_post", &self.post.is_some())
            .finish()
    }
}

/// Executes stages in declared order against a run context.
#[derive(Debug, Default)]
pub struct Sequencer;

impl Sequencer {
    /// Runs the stage sequence.
    ///
    /// Evaluates each stage's condition against the branch and the
    /// aggregate result so far; skips are not failures. On the first body
    /// failure the aggregate result is set to failure and no further
    /// stage is considered — control returns to the caller, which is
    /// expected to finalize. Already-completed stages are not rolled back.
    pub async fn run(stages: &[StageDef], ctx: &RunContext) -> RunResult {
        for stage in stages {
            if !stage.condition.is_met(ctx.branch(), ctx.result()) {
                debug!(
                    stage = %stage.name,
                    branch = ctx.branch(),
                    prior = %ctx.result(),
                    "stage skipped"
                );
                continue;
            }

            let started = Instant::now();
            info!(stage = %stage.name, "stage started");

            let body_result = Self::run_body(stage, ctx).await;

            if let Some((post_name, post)) = &stage.post {
                // Best-effort, regardless of body outcome.
                if let Err(e) = post.run(ctx).await {
                    warn!(stage = %stage.name, post = %post_name, error = %e, "post-action failed");
                }
            }

            match body_result {
                Ok(()) => {
                    info!(
                        stage = %stage.name,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "stage completed"
                    );
                }
                Err(e) => {
                    error!(stage = %stage.name, error = %e, "stage failed, halting sequence");
                    ctx.record_failure();
                    return ctx.result();
                }
            }
        }

        ctx.record_success();
        ctx.result()
    }

    async fn run_body(stage: &StageDef, ctx: &RunContext) -> Result<(), StageError> {
        for action in &stage.body {
            action.execute(ctx).await.map_err(|source| StageError {
                stage: stage.name.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
