//! Run identity and lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// The aggregate result of a run.
///
/// A run starts `Pending`, may be set to `Failure` exactly once by the
/// sequencer, and defaults to `Success` at finalize time if never failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunResult {
    /// No stage has failed yet.
    #[default]
    Pending,
    /// All executed stages completed.
    Success,
    /// A stage body failed.
    Failure,
}

impl RunResult {
    /// Returns true if no failure has been recorded.
    ///
    /// Production-affecting stages gate on this rather than on stage names.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Pending | Self::Success)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Identity of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunId {
    /// Monotonic build number, allocated at trigger receipt.
    pub build_number: u64,
    /// Unique id distinguishing runs across orchestrator restarts.
    pub uuid: Uuid,
}

impl RunId {
    /// Creates a run id for the given build number.
    #[must_use]
    pub fn new(build_number: u64) -> Self {
        Self {
            build_number,
            uuid: Uuid::new_v4(),
        }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.build_number)
    }
}

/// Inbound source-control push event that triggers a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// The pushed branch name.
    pub branch: String,
    /// Head commit id, when the forge provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Pushing user, when the forge provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pusher: Option<String>,
}

impl PushEvent {
    /// Creates a push event for a branch.
    #[must_use]
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            commit: None,
            pusher: None,
        }
    }

    /// Sets the head commit.
    #[must_use]
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }
}

/// The record of one run, terminal once the finalizer completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identity.
    pub id: RunId,
    /// Source branch.
    pub branch: String,
    /// The triggering event.
    pub trigger: PushEvent,
    /// Final result.
    pub result: RunResult,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration through finalization.
    pub duration: Duration,
}
