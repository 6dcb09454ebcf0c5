//! The guarded action runner: optional timeout and bounded retry around a
//! single external call.

use super::Action;
use crate::context::RunContext;
use crate::errors::GuardError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Guard policy for one action.
///
/// Retry is fixed-count and immediate; declaring `max_attempts > 1` is a
/// statement that the action is idempotent or at-least-once-safe. A timed
/// out attempt counts as a failed attempt. The underlying call may still
/// complete after the bound; collaborators are expected to tolerate that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    /// Total tries, including the first. Always at least 1.
    pub max_attempts: usize,
    /// Per-attempt completion bound.
    pub timeout: Option<Duration>,
}

impl Default for Guard {
    fn default() -> Self {
        Self::once()
    }
}

impl Guard {
    /// A guard that tries exactly once with no bound.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            timeout: None,
        }
    }

    /// Sets the total attempt count. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Executes the action under this guard.
    pub async fn execute(
        &self,
        name: &str,
        action: &dyn Action,
        ctx: &RunContext,
    ) -> Result<(), GuardError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let outcome = match self.timeout {
                Some(bound) => match tokio::time::timeout(bound, action.run(ctx)).await {
                    Ok(result) => result,
                    Err(_elapsed) => {
                        warn!(action = name, attempt, timeout = ?bound, "action timed out");
                        if attempt < self.max_attempts {
                            continue;
                        }
                        return Err(GuardError::TimedOut {
                            action: name.to_string(),
                            timeout: bound,
                        });
                    }
                },
                None => action.run(ctx).await,
            };

            match outcome {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(action = name, attempt, "action succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(action = name, attempt, error = %e, "action attempt failed");
                }
            }
        }

        Err(GuardError::Exhausted {
            action: name.to_string(),
            attempts: self.max_attempts,
            last_error,
        })
    }
}

/// A named action paired with its guard policy.
pub struct GuardedAction {
    /// Action name, used in logs and error messages.
    pub name: String,
    /// The guard policy.
    pub guard: Guard,
    /// The wrapped call.
    pub action: Arc<dyn Action>,
}

impl GuardedAction {
    /// Creates a guarded action with a try-once guard.
    #[must_use]
    pub fn new(name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        Self {
            name: name.into(),
            guard: Guard::once(),
            action,
        }
    }

    /// Replaces the guard policy.
    #[must_use]
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    /// Runs the action under its guard.
    pub async fn execute(&self, ctx: &RunContext) -> Result<(), GuardError> {
        self.guard.execute(&self.name, self.action.as_ref(), ctx).await
    }
}

impl std::fmt::Debug for GuardedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedAction")
            .field("name", &self.name)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
