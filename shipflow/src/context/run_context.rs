//! The mutable context threaded through one run.

use super::VariableSet;
use crate::core::{PushEvent, RunId, RunResult};
use crate::errors::ContextError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Append-only, single-writer tags computed mid-run.
///
/// The frozen [`VariableSet`] never changes after resolution; anything a
/// later stage needs from an earlier one lands here instead. Each tag is
/// written at most once (only the version-tagging stage writes
/// `semantic_version`).
#[derive(Debug, Default)]
pub struct ComputedTags {
    semantic_version: RwLock<Option<String>>,
}

impl ComputedTags {
    /// Records the resolved semantic version.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::TagAlreadySet`] on a second write.
    pub fn set_semantic_version(&self, version: impl Into<String>) -> Result<(), ContextError> {
        let mut slot = self.semantic_version.write();
        if slot.is_some() {
            return Err(ContextError::TagAlreadySet {
                name: "semantic_version".to_string(),
            });
        }
        *slot = Some(version.into());
        Ok(())
    }

    /// Returns the semantic version, if the version-tagging stage has run.
    ///
    /// Stages that depend on it treat `None` as a hard precondition
    /// failure.
    #[must_use]
    pub fn semantic_version(&self) -> Option<String> {
        self.semantic_version.read().clone()
    }
}

/// The context for a single run.
///
/// One run is one sequential thread of control; concurrent runs each get
/// their own context and workspace and share nothing mutable.
pub struct RunContext {
    id: RunId,
    trigger: PushEvent,
    started_at: DateTime<Utc>,
    started: Instant,
    vars: VariableSet,
    /// Tags computed mid-run (semantic version).
    pub tags: ComputedTags,
    workspace: PathBuf,
    result: RwLock<RunResult>,
}

impl RunContext {
    /// Creates the context for a freshly triggered run.
    #[must_use]
    pub fn new(id: RunId, trigger: PushEvent, vars: VariableSet, workspace: PathBuf) -> Self {
        Self {
            id,
            trigger,
            started_at: Utc::now(),
            started: Instant::now(),
            vars,
            tags: ComputedTags::default(),
            workspace,
            result: RwLock::new(RunResult::Pending),
        }
    }

    /// Returns the run identity.
    #[must_use]
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// Returns the source branch.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.trigger.branch
    }

    /// Returns the triggering push event.
    #[must_use]
    pub fn trigger(&self) -> &PushEvent {
        &self.trigger
    }

    /// Returns the run start time.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the elapsed wall-clock time so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the frozen variable set.
    #[must_use]
    pub fn vars(&self) -> &VariableSet {
        &self.vars
    }

    /// Returns the run-isolated workspace directory.
    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Returns the current aggregate result.
    #[must_use]
    pub fn result(&self) -> RunResult {
        *self.result.read()
    }

    /// Records a stage failure. Only the sequencer calls this; the
    /// transition is one-way.
    pub fn record_failure(&self) {
        *self.result.write() = RunResult::Failure;
    }

    /// Marks the run successful, unless a failure was already recorded.
    pub fn record_success(&self) {
        let mut result = self.result.write();
        if result.is_ok() {
            *result = RunResult::Success;
        }
    }

    /// Returns the final result, defaulting to success if never failed.
    #[must_use]
    pub fn final_result(&self) -> RunResult {
        match self.result() {
            RunResult::Failure => RunResult::Failure,
            RunResult::Pending | RunResult::Success => RunResult::Success,
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("id", &self.id)
            .field("branch", &self.trigger.branch)
            .field("result", &self.result())
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> RunContext {
        RunContext::new(
            RunId::new(1),
            PushEvent::new("main"),
            VariableSet::default(),
            PathBuf::from("/tmp/shipflow-test"),
        )
    }

    #[test]
    fn test_result_starts_pending() {
        let ctx = test_context();
        assert_eq!(ctx.result(), RunResult::Pending);
        assert_eq!(ctx.final_result(), RunResult::Success);
    }

    #[test]
    fn test_failure_is_sticky() {
        let ctx = test_context();
        ctx.record_failure();
        ctx.record_success();
        assert_eq!(ctx.result(), RunResult::Failure);
        assert_eq!(ctx.final_result(), RunResult::Failure);
    }

    #[test]
    fn test_semantic_version_single_writer() {
        let ctx = test_context();
        assert!(ctx.tags.semantic_version().is_none());

        ctx.tags.set_semantic_version("1.2.0").unwrap();
        assert_eq!(ctx.tags.semantic_version().as_deref(), Some("1.2.0"));

        let err = ctx.tags.set_semantic_version("1.3.0").unwrap_err();
        assert!(err.to_string().contains("semantic_version"));
        // First write wins.
        assert_eq!(ctx.tags.semantic_version().as_deref(), Some("1.2.0"));
    }

    #[test]
    fn test_debug_omits_variables() {
        let ctx = test_context();
        let rendered = format!("{ctx:?}");
        assert!(rendered.contains("RunContext"));
        assert!(!rendered.contains("vars"));
    }
}
