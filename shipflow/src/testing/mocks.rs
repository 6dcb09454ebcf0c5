//! Recording mocks for the collaborator traits.
//!
//! Each mock records its calls and can be scripted to fail, so tests can
//! drive every gating and retry path without real external systems.

use crate::context::Secret;
use crate::core::{ImageRef, RunNotification};
use crate::delivery::{
    Collaborators, DeployConfigRepo, E2eParams, ImageBuilder, ImageRegistry, Notifier,
    TestRunner, VersionResolver,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock build toolchain.
#[derive(Debug, Default)]
pub struct MockBuilder {
    /// Images built, in order.
    pub builds: Mutex<Vec<ImageRef>>,
    /// Local retags performed, as `(source, target)` pairs.
    pub tags: Mutex<Vec<(ImageRef, ImageRef)>>,
    /// Build numbers whose artifacts were removed.
    pub removed: Mutex<Vec<u64>>,
    /// Prune invocations.
    pub prunes: AtomicUsize,
    fail_build: AtomicBool,
}

impl MockBuilder {
    /// Makes the next builds fail.
    pub fn fail_builds(&self) {
        self.fail_build.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageBuilder for MockBuilder {
    async fn build(&self, _workspace: &Path, image: &ImageRef) -> anyhow::Result<()> {
        self.builds.lock().push(image.clone());
        if self.fail_build.load(Ordering::SeqCst) {
            anyhow::bail!("build failed");
        }
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> anyhow::Result<()> {
        self.tags.lock().push((source.clone(), target.clone()));
        Ok(())
    }

    async fn remove_build_artifacts(&self, build_number: u64) -> anyhow::Result<()> {
        self.removed.lock().push(build_number);
        Ok(())
    }

    async fn prune(&self) -> anyhow::Result<()> {
        self.prunes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock registry client shared by both registry addresses.
#[derive(Debug, Default)]
pub struct MockRegistry {
    /// Registry addresses logged into, in order.
    pub logins: Mutex<Vec<String>>,
    /// Images pushed, in order.
    pub pushes: Mutex<Vec<ImageRef>>,
    /// Images pulled, in order.
    pub pulls: Mutex<Vec<ImageRef>>,
    push_failures: AtomicUsize,
}

impl MockRegistry {
    /// Scripts the next `n` pushes to fail with a transient error.
    pub fn fail_next_pushes(&self, n: usize) {
        self.push_failures.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageRegistry for MockRegistry {
    async fn login(&self, registry: &str, _user: &Secret, _token: &Secret) -> anyhow::Result<()> {
        self.logins.lock().push(registry.to_string());
        Ok(())
    }

    async fn push(&self, image: &ImageRef) -> anyhow::Result<()> {
        self.pushes.lock().push(image.clone());
        let remaining = self.push_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.push_failures.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("connection reset during push");
        }
        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> anyhow::Result<()> {
        self.pulls.lock().push(image.clone());
        Ok(())
    }
}

/// Mock test runner with scriptable suite outcomes.
#[derive(Debug, Default)]
pub struct MockTestRunner {
    /// Unit suite invocations.
    pub unit_calls: AtomicUsize,
    /// Parameters of each e2e invocation.
    pub e2e_calls: Mutex<Vec<E2eParams>>,
    /// Report archival invocations.
    pub archives: AtomicUsize,
    fail_unit: AtomicBool,
    fail_e2e: AtomicBool,
}

impl MockTestRunner {
    /// Makes the unit suite fail.
    pub fn fail_unit(&self) {
        self.fail_unit.store(true, Ordering::SeqCst);
    }

    /// Makes the e2e suite fail.
    pub fn fail_e2e(&self) {
        self.fail_e2e.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TestRunner for MockTestRunner {
    async fn unit(&self, _workspace: &Path) -> anyhow::Result<()> {
        self.unit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unit.load(Ordering::SeqCst) {
            anyhow::bail!("unit suite failed");
        }
        Ok(())
    }

    async fn e2e(&self, params: &E2eParams) -> anyhow::Result<()> {
        self.e2e_calls.lock().push(params.clone());
        if self.fail_e2e.load(Ordering::SeqCst) {
            anyhow::bail!("e2e suite failed");
        }
        Ok(())
    }

    async fn archive_report(&self, _workspace: &Path) -> anyhow::Result<()> {
        self.archives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock version resolver returning a fixed version.
#[derive(Debug)]
pub struct MockVersionResolver {
    /// The version to hand out.
    pub version: Mutex<String>,
    /// Resolution invocations.
    pub calls: AtomicUsize,
}

impl Default for MockVersionResolver {
    fn default() -> Self {
        Self {
            version: Mutex::new("1.2.0".to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VersionResolver for MockVersionResolver {
    async fn next_version(&self, _branch: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.version.lock().clone())
    }
}

/// Mock deployment-config repository backed by an in-memory manifest.
///
/// `checkout_into` materializes the manifest into the checkout;
/// `commit_and_push` captures the manifest content as committed.
#[derive(Debug)]
pub struct MockDeployRepo {
    manifest_path: String,
    /// Current remote manifest content.
    pub manifest: Mutex<String>,
    /// Clone invocations.
    pub clones: AtomicUsize,
    /// Commit messages pushed, in order.
    pub commits: Mutex<Vec<String>>,
}

impl MockDeployRepo {
    /// Creates a repository serving the given manifest.
    #[must_use]
    pub fn new(manifest_path: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            manifest: Mutex::new(manifest.into()),
            clones: AtomicUsize::new(0),
            commits: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DeployConfigRepo for MockDeployRepo {
    async fn checkout_into(&self, dest: &Path) -> anyhow::Result<()> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        // Copy out of the guard; holding it across the await would make
        // the future non-Send.
        let content = self.manifest.lock().clone();
        tokio::fs::create_dir_all(dest).await?;
        tokio::fs::write(dest.join(&self.manifest_path), content.as_bytes()).await?;
        Ok(())
    }

    async fn commit_and_push(&self, checkout: &Path, message: &str) -> anyhow::Result<()> {
        let content =
            tokio::fs::read_to_string(checkout.join(&self.manifest_path)).await?;
        *self.manifest.lock() = content;
        self.commits.lock().push(message.to_string());
        Ok(())
    }
}

/// Mock notification transport.
#[derive(Debug, Default)]
pub struct MockNotifier {
    /// Messages delivered, in order.
    pub notes: Mutex<Vec<RunNotification>>,
    fail: AtomicBool,
}

impl MockNotifier {
    /// Makes delivery fail.
    pub fn fail_delivery(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, note: &RunNotification) -> anyhow::Result<()> {
        self.notes.lock().push(note.clone());
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("notification transport unavailable");
        }
        Ok(())
    }
}

/// Handles onto the mocks behind a [`Collaborators`] bundle.
#[derive(Debug, Clone)]
pub struct MockHandles {
    /// Build toolchain mock.
    pub builder: Arc<MockBuilder>,
    /// Registry mock.
    pub registry: Arc<MockRegistry>,
    /// Test runner mock.
    pub tests: Arc<MockTestRunner>,
    /// Version resolver mock.
    pub versions: Arc<MockVersionResolver>,
    /// Deployment-config repository mock.
    pub deploy_repo: Arc<MockDeployRepo>,
    /// Notifier mock.
    pub notifier: Arc<MockNotifier>,
}

/// Builds a full mock collaborator bundle with a default manifest whose
/// backend tag is `1.1.0`.
#[must_use]
pub fn mock_collaborators() -> (MockHandles, Collaborators) {
    let manifest = "\
backend:
  image:
    repository: apps/backend
    tag: \"1.1.0\"
frontend:
  image:
    tag: \"2.0.0\"
";

    let handles = MockHandles {
        builder: Arc::new(MockBuilder::default()),
        registry: Arc::new(MockRegistry::default()),
        tests: Arc::new(MockTestRunner::default()),
        versions: Arc::new(MockVersionResolver::default()),
        deploy_repo: Arc::new(MockDeployRepo::new("values.yaml", manifest)),
        notifier: Arc::new(MockNotifier::default()),
    };

    let collab = Collaborators {
        builder: handles.builder.clone(),
        registry: handles.registry.clone(),
        tests: handles.tests.clone(),
        versions: handles.versions.clone(),
        deploy_repo: handles.deploy_repo.clone(),
        notifier: handles.notifier.clone(),
    };

    (handles, collab)
}
