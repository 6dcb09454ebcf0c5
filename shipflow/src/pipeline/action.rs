//! The unit of external work a stage body is made of.

use crate::context::RunContext;
use async_trait::async_trait;
use std::fmt::Debug;

/// A single external call made on behalf of a stage.
///
/// Actions are owned exclusively by the stage that declares them and are
/// executed front to back through the [`super::Guard`] wrapper. An action
/// declaring retry must be safe to repeat.
#[async_trait]
pub trait Action: Send + Sync {
    /// Performs the call against the run context.
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()>;
}

/// A synchronous function-based action, mostly useful in tests.
pub struct FnAction<F>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync,
{
    func: F,
}

impl<F> FnAction<F>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a new function-based action.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnAction<F>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAction").finish()
    }
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        (self.func)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VariableSet;
    use crate::core::{PushEvent, RunId};
    use std::path::PathBuf;

    fn test_ctx() -> RunContext {
        RunContext::new(
            RunId::new(1),
            PushEvent::new("main"),
            VariableSet::default(),
            PathBuf::from("/tmp/shipflow-test"),
        )
    }

    #[tokio::test]
    async fn test_fn_action_success() {
        let action = FnAction::new(|ctx| {
            assert_eq!(ctx.branch(), "main");
            Ok(())
        });
        assert!(action.run(&test_ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_fn_action_failure() {
        let action = FnAction::new(|_ctx| anyhow::bail!("boom"));
        assert!(action.run(&test_ctx()).await.is_err());
    }
}
