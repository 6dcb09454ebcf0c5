//! Core value types shared across the orchestrator.

mod run;

pub use run::{PushEvent, RunId, RunRecord, RunResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// An addressable container image: `(registry, repository, tag)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Registry address, e.g. `123456.dkr.example.com/acme`.
    pub registry: String,
    /// Repository name within the registry.
    pub repository: String,
    /// Image tag.
    pub tag: String,
}

impl ImageRef {
    /// Creates a new image reference.
    #[must_use]
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Returns the same image addressed under a different tag.
    #[must_use]
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: tag.into(),
        }
    }

    /// Returns the same image addressed in a different registry.
    #[must_use]
    pub fn with_registry(&self, registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            repository: self.repository.clone(),
            tag: self.tag.clone(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

/// The single outbound message emitted per run at finalize time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunNotification {
    /// Final run result.
    pub result: RunResult,
    /// Monotonic build number of the run.
    pub build_number: u64,
    /// Source branch that triggered the run.
    pub branch: String,
    /// Elapsed wall-clock duration.
    pub duration: Duration,
    /// Reference link back to the run.
    pub run_link: String,
}

impl RunNotification {
    /// Renders the one-line summary used by plain-text transports.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "build #{} on {} finished {} in {:.1}s ({})",
            self.build_number,
            self.branch,
            self.result,
            self.duration.as_secs_f64(),
            self.run_link,
        )
    }
}
