//! Run-scoped workspace helpers.
//!
//! Every run executes in its own directory so concurrent runs never share
//! a checkout or artifact cache; the finalizer releases it.

use crate::context::RunContext;
use crate::pipeline::Action;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// The deployment-config checkout directory inside a run's workspace.
#[must_use]
pub fn checkout_dir(ctx: &RunContext) -> PathBuf {
    ctx.workspace().join("deploy-config")
}

/// Finalizer step: removes the deployment-config checkout, if one was
/// cloned.
#[derive(Debug, Default)]
pub struct RemoveCheckout;

#[async_trait]
impl Action for RemoveCheckout {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let dir = checkout_dir(ctx);
        if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&dir).await?;
            debug!(dir = %dir.display(), "removed deploy-config checkout");
        }
        Ok(())
    }
}

/// Finalizer step: releases the run workspace itself. Runs last.
#[derive(Debug, Default)]
pub struct ReleaseWorkspace;

#[async_trait]
impl Action for ReleaseWorkspace {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        if tokio::fs::try_exists(ctx.workspace()).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(ctx.workspace()).await?;
            debug!(dir = %ctx.workspace().display(), "released workspace");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VariableSet;
    use crate::core::{PushEvent, RunId};

    fn ctx_in(dir: PathBuf) -> RunContext {
        RunContext::new(
            RunId::new(1),
            PushEvent::new("main"),
            VariableSet::default(),
            dir,
        )
    }

    #[tokio::test]
    async fn test_release_removes_workspace() {
        let root = tempfile::tempdir().unwrap();
        let workspace = root.path().join("run-1");
        tokio::fs::create_dir_all(&workspace).await.unwrap();

        let ctx = ctx_in(workspace.clone());
        ReleaseWorkspace.run(&ctx).await.unwrap();

        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn test_release_tolerates_missing_workspace() {
        let ctx = ctx_in(PathBuf::from("/nonexistent/shipflow-run"));
        assert!(ReleaseWorkspace.run(&ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_checkout_only_touches_the_clone() {
        let root = tempfile::tempdir().unwrap();
        let workspace = root.path().join("run-1");
        let ctx = ctx_in(workspace.clone());

        tokio::fs::create_dir_all(checkout_dir(&ctx)).await.unwrap();
        tokio::fs::write(workspace.join("artifact.txt"), b"keep")
            .await
            .unwrap();

        RemoveCheckout.run(&ctx).await.unwrap();

        assert!(!checkout_dir(&ctx).exists());
        assert!(workspace.join("artifact.txt").exists());
    }
}
