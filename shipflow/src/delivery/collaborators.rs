//! Contracts expected from the external collaborators.
//!
//! The orchestrator specifies only inputs given, outputs consumed, and
//! how failure is signaled; build semantics, registry storage, test suite
//! content and rollout mechanics live behind these seams.

use crate::context::Secret;
use crate::core::{ImageRef, RunNotification};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// The container build toolchain.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Builds a tagged image from the checked-out source.
    async fn build(&self, workspace: &Path, image: &ImageRef) -> anyhow::Result<()>;

    /// Retags an already-built image locally.
    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> anyhow::Result<()>;

    /// Removes the local artifacts produced for a build. Finalizer hook.
    async fn remove_build_artifacts(&self, build_number: u64) -> anyhow::Result<()>;

    /// Prunes dangling local resources. Finalizer hook.
    async fn prune(&self) -> anyhow::Result<()>;
}

/// An addressable image store, keyed by `(registry, repository, tag)`.
///
/// Push and pull must be at-least-once-safe: the guard may repeat them,
/// and a timed-out call may still complete afterwards.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Authenticates against a registry address.
    async fn login(&self, registry: &str, user: &Secret, token: &Secret) -> anyhow::Result<()>;

    /// Pushes an image.
    async fn push(&self, image: &ImageRef) -> anyhow::Result<()>;

    /// Pulls an image. Used to re-fetch the staged artifact before
    /// production promotion.
    async fn pull(&self, image: &ImageRef) -> anyhow::Result<()>;
}

/// Parameters handed to the external end-to-end test runner.
#[derive(Debug, Clone)]
pub struct E2eParams {
    /// The freshly staged backend image under test.
    pub backend_image: ImageRef,
    /// Companion frontend image.
    pub frontend_image: ImageRef,
    /// Companion worker image.
    pub worker_image: ImageRef,
    /// Where the runner reports progress.
    pub notify_address: String,
}

/// The test runner collaborator; blocks until completion, failure is the
/// error path.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Runs the unit test suite against the checkout.
    async fn unit(&self, workspace: &Path) -> anyhow::Result<()>;

    /// Runs the end-to-end suite against the staged images.
    async fn e2e(&self, params: &E2eParams) -> anyhow::Result<()>;

    /// Archives whatever report the last suite produced. Invoked
    /// best-effort regardless of suite outcome.
    async fn archive_report(&self, workspace: &Path) -> anyhow::Result<()>;
}

/// Produces the semantic version for an eligible run. Called at most once
/// per run; the call mutates external version history and is never
/// retried.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    /// Computes the next semantic version for the branch.
    async fn next_version(&self, branch: &str) -> anyhow::Result<String>;
}

/// The git-backed deployment-config repository consumed by the cluster
/// reconciler. Its commit history is the audit trail of what is deployed.
#[async_trait]
pub trait DeployConfigRepo: Send + Sync {
    /// Clones a fresh checkout into the given directory.
    ///
    /// Not named `clone_into`: on an `Arc<dyn DeployConfigRepo>` receiver
    /// that name resolves to `ToOwned::clone_into` instead of this method.
    async fn checkout_into(&self, dest: &Path) -> anyhow::Result<()>;

    /// Commits all changes in the checkout and pushes. Mutates remote git
    /// history; never retried.
    async fn commit_and_push(&self, checkout: &Path, message: &str) -> anyhow::Result<()>;
}

/// The notification transport: one outbound message per run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers the run's terminal status to the fixed recipient.
    async fn notify(&self, note: &RunNotification) -> anyhow::Result<()>;
}

/// Bundle of collaborator handles wired into the pipeline at assembly.
#[derive(Clone)]
pub struct Collaborators {
    /// Build toolchain.
    pub builder: Arc<dyn ImageBuilder>,
    /// Registry client, shared by staging and production addresses.
    pub registry: Arc<dyn ImageRegistry>,
    /// Test runner.
    pub tests: Arc<dyn TestRunner>,
    /// Version resolver.
    pub versions: Arc<dyn VersionResolver>,
    /// Deployment-config repository.
    pub deploy_repo: Arc<dyn DeployConfigRepo>,
    /// Notification transport.
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
