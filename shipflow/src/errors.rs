//! Error types for the shipflow orchestrator.
//!
//! The taxonomy mirrors the propagation policy: resolution failures are
//! fatal before any stage runs, guard failures fail the owning stage,
//! stage failures halt the sequence, and finalizer step failures are
//! logged and swallowed (they have no typed representation here).

use std::time::Duration;
use thiserror::Error;

/// Error raised when the variable set cannot be fully resolved.
///
/// Resolution is all-or-nothing: any variant here means no stage executed.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A named secret was not known to the secret source.
    #[error("secret '{name}' could not be resolved")]
    Missing {
        /// The unresolvable name.
        name: String,
    },

    /// The secret source itself failed.
    #[error("secret source failed resolving '{name}': {source}")]
    Source {
        /// The name being resolved when the source failed.
        name: String,
        /// The underlying source error.
        #[source]
        source: anyhow::Error,
    },
}

/// Error raised by the guarded action runner.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The action failed on every permitted attempt.
    #[error("action '{action}' failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        /// The action name.
        action: String,
        /// Total tries made.
        attempts: usize,
        /// The error from the final attempt.
        last_error: String,
    },

    /// The action did not complete within its timeout on the final attempt.
    #[error("action '{action}' timed out after {timeout:?}")]
    TimedOut {
        /// The action name.
        action: String,
        /// The configured bound.
        timeout: Duration,
    },
}

/// Error raised when a stage body fails, halting the sequence.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct StageError {
    /// The failing stage name.
    pub stage: String,
    /// The guard failure that sank the body.
    #[source]
    pub source: GuardError,
}

/// Error raised on an invalid write to the run-scoped computed tags.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A computed tag was written twice; writes are append-only and
    /// single-writer.
    #[error("computed tag '{name}' is already set")]
    TagAlreadySet {
        /// The tag name.
        name: String,
    },
}

/// The main error type for shipflow operations.
#[derive(Debug, Error)]
pub enum ShipflowError {
    /// Variable resolution failed before stage 1.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// A stage failed and halted the sequence.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// A run-context invariant was violated.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::Missing {
            name: "REGISTRY_TOKEN".to_string(),
        };
        assert_eq!(err.to_string(), "secret 'REGISTRY_TOKEN' could not be resolved");
    }

    #[test]
    fn test_guard_error_display() {
        let err = GuardError::Exhausted {
            action: "push-image".to_string(),
            attempts: 3,
            last_error: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("push-image"));
        assert!(err.to_string().contains("3 attempt(s)"));
    }

    #[test]
    fn test_stage_error_carries_source() {
        let err = StageError {
            stage: "stage-push".to_string(),
            source: GuardError::TimedOut {
                action: "push-image".to_string(),
                timeout: Duration::from_secs(30),
            },
        };
        assert!(err.to_string().starts_with("stage 'stage-push' failed"));
    }
}
