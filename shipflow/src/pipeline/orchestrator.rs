//! The run-to-completion controller: resolve, sequence, always finalize.

use super::{Finalizer, Sequencer, StageDef};
use crate::context::{resolve, RunContext, SecretSource, VariableSet};
use crate::core::{PushEvent, RunId, RunRecord};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// A statically-defined pipeline: the ordered stage set plus its
/// finalizer.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<StageDef>,
    finalizer: Finalizer,
}

impl Pipeline {
    /// Starts building a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Returns the stage definitions in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageDef] {
        &self.stages
    }
}

/// Builder assembling a [`Pipeline`] stage by stage.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<StageDef>,
    finalizer: Finalizer,
}

impl PipelineBuilder {
    /// Appends a stage; declaration order is execution order.
    #[must_use]
    pub fn stage(mut self, stage: StageDef) -> Self {
        self.stages.push(stage);
        self
    }

    /// Sets the finalizer.
    #[must_use]
    pub fn finalizer(mut self, finalizer: Finalizer) -> Self {
        self.finalizer = finalizer;
        self
    }

    /// Finishes the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            finalizer: self.finalizer,
        }
    }
}

/// Drives runs through a pipeline, one per trigger event.
///
/// Each run gets a monotonic build number, an isolated workspace
/// directory, and a freshly resolved variable set. Concurrent runs are
/// independent; they share only the external collaborators.
pub struct Orchestrator {
    pipeline: Pipeline,
    secret_source: Arc<dyn SecretSource>,
    secret_names: Vec<String>,
    workspace_root: PathBuf,
    build_counter: AtomicU64,
}

impl Orchestrator {
    /// Creates an orchestrator over a pipeline.
    #[must_use]
    pub fn new(
        pipeline: Pipeline,
        secret_source: Arc<dyn SecretSource>,
        secret_names: Vec<String>,
        workspace_root: PathBuf,
    ) -> Self {
        Self {
            pipeline,
            secret_source,
            secret_names,
            workspace_root,
            build_counter: AtomicU64::new(0),
        }
    }

    /// Sets the next build number to allocate.
    #[must_use]
    pub fn starting_at(self, build_number: u64) -> Self {
        self.build_counter.store(build_number, Ordering::SeqCst);
        self
    }

    /// Executes one run for a push event.
    ///
    /// The finalizer runs on every exit path, including secret-resolution
    /// failure and workspace acquisition failure, so every run emits
    /// exactly one terminal status.
    pub async fn execute(&self, event: PushEvent) -> RunRecord {
        let build_number = self.build_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = RunId::new(build_number);
        let workspace = self
            .workspace_root
            .join(format!("run-{}-{}", id.build_number, id.uuid));

        info!(run = %id, branch = %event.branch, "run triggered");

        let names: Vec<&str> = self.secret_names.iter().map(String::as_str).collect();
        let (vars, resolve_failed) = match resolve(self.secret_source.as_ref(), &names).await {
            Ok(vars) => (vars, false),
            Err(e) => {
                error!(run = %id, error = %e, "variable resolution failed, no stages will run");
                (VariableSet::default(), true)
            }
        };

        let ctx = RunContext::new(id, event, vars, workspace);

        if resolve_failed {
            ctx.record_failure();
        } else if let Err(e) = tokio::fs::create_dir_all(ctx.workspace()).await {
            error!(run = %ctx.id(), error = %e, "workspace acquisition failed");
            ctx.record_failure();
        } else {
            Sequencer::run(&self.pipeline.stages, &ctx).await;
        }

        self.pipeline.finalizer.finalize(&ctx).await;

        let record = RunRecord {
            id: ctx.id().clone(),
            branch: ctx.branch().to_string(),
            trigger: ctx.trigger().clone(),
            result: ctx.final_result(),
            started_at: ctx.started_at(),
            duration: ctx.elapsed(),
        };

        info!(
            run = %record.id,
            result = %record.result,
            duration_ms = record.duration.as_millis() as u64,
            "run finalized"
        );

        record
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.pipeline.stages.len())
            .field("workspace_root", &self.workspace_root)
            .finish_non_exhaustive()
    }
}
