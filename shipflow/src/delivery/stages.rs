//! Assembly of the standard delivery pipeline.
//!
//! Seven stages: unit tests, image build, staging push, e2e tests (order
//! of the last two is configurable), then the production-affecting trio —
//! version tagging, promotion, deployment-config update — gated on the
//! release branches and on a clean run so far.

use super::workspace::{checkout_dir, ReleaseWorkspace, RemoveCheckout};
use super::{
    commit_message, registry_address, rewrite_tag, Collaborators, DeliveryConfig,
    DeployConfigRepo, E2eParams, ImageBuilder, ImageRegistry, Notifier, TestOrder, TestRunner,
    VersionResolver,
};
use crate::context::{RunContext, Secret, SecretSource};
use crate::core::{ImageRef, RunNotification};
use crate::pipeline::{
    Action, Finalizer, Guard, GuardedAction, Orchestrator, Pipeline, RunCondition, StageDef,
};
use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn var<'a>(ctx: &'a RunContext, name: &str) -> anyhow::Result<&'a Secret> {
    ctx.vars()
        .get(name)
        .with_context(|| format!("variable '{name}' missing from resolved set"))
}

fn staging_registry(cfg: &DeliveryConfig, ctx: &RunContext) -> anyhow::Result<String> {
    Ok(registry_address(
        var(ctx, &cfg.staging_account_var)?.expose(),
        &cfg.region,
    ))
}

fn production_registry(cfg: &DeliveryConfig, ctx: &RunContext) -> anyhow::Result<String> {
    Ok(registry_address(
        var(ctx, &cfg.production_account_var)?.expose(),
        &cfg.region,
    ))
}

/// The build-number-tagged backend image in the staging registry.
fn staged_image(cfg: &DeliveryConfig, ctx: &RunContext) -> anyhow::Result<ImageRef> {
    Ok(ImageRef::new(
        staging_registry(cfg, ctx)?,
        cfg.backend_repository.clone(),
        ctx.id().build_number.to_string(),
    ))
}

/// Resolved semantic version, a hard precondition for promotion and
/// deployment.
fn semantic_version(ctx: &RunContext) -> anyhow::Result<String> {
    ctx.tags
        .semantic_version()
        .context("semantic version not resolved; version-tag stage has not succeeded")
}

#[derive(Debug, Clone, Copy)]
enum RegistryTarget {
    Staging,
    Production,
}

struct UnitTests {
    tests: Arc<dyn TestRunner>,
}

#[async_trait]
impl Action for UnitTests {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        self.tests.unit(ctx.workspace()).await
    }
}

struct BuildImage {
    builder: Arc<dyn ImageBuilder>,
    cfg: DeliveryConfig,
}

#[async_trait]
impl Action for BuildImage {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let image = staged_image(&self.cfg, ctx)?;
        self.builder.build(ctx.workspace(), &image).await
    }
}

struct RegistryLogin {
    registry: Arc<dyn ImageRegistry>,
    cfg: DeliveryConfig,
    target: RegistryTarget,
}

#[async_trait]
impl Action for RegistryLogin {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let address = match self.target {
            RegistryTarget::Staging => staging_registry(&self.cfg, ctx)?,
            RegistryTarget::Production => production_registry(&self.cfg, ctx)?,
        };
        let user = var(ctx, &self.cfg.registry_user_var)?;
        let token = var(ctx, &self.cfg.registry_token_var)?;
        self.registry.login(&address, user, token).await
    }
}

struct PushStaging {
    registry: Arc<dyn ImageRegistry>,
    cfg: DeliveryConfig,
}

#[async_trait]
impl Action for PushStaging {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        self.registry.push(&staged_image(&self.cfg, ctx)?).await
    }
}

struct RunE2e {
    tests: Arc<dyn TestRunner>,
    cfg: DeliveryConfig,
}

#[async_trait]
impl Action for RunE2e {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let staging = staging_registry(&self.cfg, ctx)?;
        let params = E2eParams {
            backend_image: staged_image(&self.cfg, ctx)?,
            frontend_image: ImageRef::new(staging.clone(), self.cfg.frontend_repository.clone(), "latest"),
            worker_image: ImageRef::new(staging, self.cfg.worker_repository.clone(), "latest"),
            notify_address: self.cfg.e2e_notify_address.clone(),
        };
        self.tests.e2e(&params).await
    }
}

struct ArchiveReport {
    tests: Arc<dyn TestRunner>,
}

#[async_trait]
impl Action for ArchiveReport {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        self.tests.archive_report(ctx.workspace()).await
    }
}

struct ResolveVersion {
    versions: Arc<dyn VersionResolver>,
}

#[async_trait]
impl Action for ResolveVersion {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let version = self.versions.next_version(ctx.branch()).await?;
        info!(version = %version, "semantic version resolved");
        ctx.tags.set_semantic_version(version)?;
        Ok(())
    }
}

struct PullStaged {
    registry: Arc<dyn ImageRegistry>,
    cfg: DeliveryConfig,
}

#[async_trait]
impl Action for PullStaged {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        self.registry.pull(&staged_image(&self.cfg, ctx)?).await
    }
}

/// Retags the staged image as `<version>` and `latest` in the production
/// registry and pushes both. Repeat-safe end to end.
struct PromotePush {
    builder: Arc<dyn ImageBuilder>,
    registry: Arc<dyn ImageRegistry>,
    cfg: DeliveryConfig,
}

#[async_trait]
impl Action for PromotePush {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let version = semantic_version(ctx)?;
        let staged = staged_image(&self.cfg, ctx)?;
        let production = production_registry(&self.cfg, ctx)?;

        let versioned = staged.with_registry(production.clone()).with_tag(&version);
        let latest = versioned.with_tag("latest");

        self.builder.tag(&staged, &versioned).await?;
        self.builder.tag(&staged, &latest).await?;
        self.registry.push(&versioned).await?;
        self.registry.push(&latest).await?;
        Ok(())
    }
}

/// Clones the deployment-config repository, rewrites the backend tag, and
/// commits only when a textual diff results. Mutates git history, so it
/// runs with a single attempt.
struct UpdateDeployConfig {
    repo: Arc<dyn DeployConfigRepo>,
    cfg: DeliveryConfig,
}

#[async_trait]
impl Action for UpdateDeployConfig {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let version = semantic_version(ctx)?;
        let checkout = checkout_dir(ctx);

        self.repo.checkout_into(&checkout).await?;

        let manifest = checkout.join(&self.cfg.manifest_path);
        let content = tokio::fs::read_to_string(&manifest)
            .await
            .with_context(|| format!("reading {}", manifest.display()))?;

        match rewrite_tag(
            &content,
            &self.cfg.manifest_block,
            &self.cfg.manifest_tag_field,
            &version,
        )? {
            Some(updated) => {
                tokio::fs::write(&manifest, updated).await?;
                let message = commit_message(
                    &self.cfg.manifest_block,
                    &version,
                    ctx.id().build_number,
                );
                self.repo.commit_and_push(&checkout, &message).await
            }
            None => {
                info!(version = %version, "deploy config already current, skipping commit");
                Ok(())
            }
        }
    }
}

struct RemoveBuildArtifacts {
    builder: Arc<dyn ImageBuilder>,
}

#[async_trait]
impl Action for RemoveBuildArtifacts {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        self.builder
            .remove_build_artifacts(ctx.id().build_number)
            .await
    }
}

struct PruneResources {
    builder: Arc<dyn ImageBuilder>,
}

#[async_trait]
impl Action for PruneResources {
    async fn run(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        self.builder.prune().await
    }
}

struct NotifyStatus {
    notifier: Arc<dyn Notifier>,
    cfg: DeliveryConfig,
}

#[async_trait]
impl Action for NotifyStatus {
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let note = RunNotification {
            result: ctx.final_result(),
            build_number: ctx.id().build_number,
            branch: ctx.branch().to_string(),
            duration: ctx.elapsed(),
            run_link: self.cfg.run_link(ctx.id().build_number),
        };
        self.notifier.notify(&note).await
    }
}

/// Builds the standard delivery pipeline from configuration and
/// collaborators.
#[must_use]
pub fn delivery_pipeline(cfg: &DeliveryConfig, collab: &Collaborators) -> Pipeline {
    let broad = RunCondition::branches(&cfg.broad_branches);
    let narrow = RunCondition::branches(&cfg.release_branches).with_prior_ok();

    let registry_guard = Guard::once()
        .with_attempts(cfg.registry_attempts)
        .with_timeout(cfg.registry_timeout);

    let unit_tests = StageDef::new("unit-tests", broad.clone()).action(GuardedAction::new(
        "run-unit-tests",
        Arc::new(UnitTests {
            tests: collab.tests.clone(),
        }),
    ));

    let build_image = StageDef::new("build-image", broad.clone()).action(GuardedAction::new(
        "build-image",
        Arc::new(BuildImage {
            builder: collab.builder.clone(),
            cfg: cfg.clone(),
        }),
    ));

    let stage_push = StageDef::new("stage-push", broad.clone())
        .action(
            GuardedAction::new(
                "login-staging",
                Arc::new(RegistryLogin {
                    registry: collab.registry.clone(),
                    cfg: cfg.clone(),
                    target: RegistryTarget::Staging,
                }),
            )
            .with_guard(registry_guard),
        )
        .action(
            GuardedAction::new(
                "push-staging",
                Arc::new(PushStaging {
                    registry: collab.registry.clone(),
                    cfg: cfg.clone(),
                }),
            )
            .with_guard(registry_guard),
        );

    let e2e_tests = StageDef::new("e2e-tests", broad)
        .action(
            GuardedAction::new(
                "run-e2e",
                Arc::new(RunE2e {
                    tests: collab.tests.clone(),
                    cfg: cfg.clone(),
                }),
            )
            .with_guard(Guard::once().with_timeout(cfg.e2e_timeout)),
        )
        .with_post(
            "archive-report",
            Arc::new(ArchiveReport {
                tests: collab.tests.clone(),
            }),
        );

    let version_tag = StageDef::new("version-tag", narrow.clone()).action(GuardedAction::new(
        "resolve-version",
        Arc::new(ResolveVersion {
            versions: collab.versions.clone(),
        }),
    ));

    let promote = StageDef::new("promote", narrow.clone())
        .action(
            GuardedAction::new(
                "login-production",
                Arc::new(RegistryLogin {
                    registry: collab.registry.clone(),
                    cfg: cfg.clone(),
                    target: RegistryTarget::Production,
                }),
            )
            .with_guard(registry_guard),
        )
        .action(
            GuardedAction::new(
                "pull-staged",
                Arc::new(PullStaged {
                    registry: collab.registry.clone(),
                    cfg: cfg.clone(),
                }),
            )
            .with_guard(registry_guard),
        )
        .action(
            GuardedAction::new(
                "promote-push",
                Arc::new(PromotePush {
                    builder: collab.builder.clone(),
                    registry: collab.registry.clone(),
                    cfg: cfg.clone(),
                }),
            )
            .with_guard(registry_guard),
        );

    let deploy = StageDef::new("deploy", narrow).action(GuardedAction::new(
        "update-deploy-config",
        Arc::new(UpdateDeployConfig {
            repo: collab.deploy_repo.clone(),
            cfg: cfg.clone(),
        }),
    ));

    let finalizer = Finalizer::new()
        .with_cleanup(
            "remove-build-artifacts",
            Arc::new(RemoveBuildArtifacts {
                builder: collab.builder.clone(),
            }),
        )
        .with_cleanup(
            "prune-resources",
            Arc::new(PruneResources {
                builder: collab.builder.clone(),
            }),
        )
        .with_cleanup("remove-checkout", Arc::new(RemoveCheckout))
        .with_notify(Arc::new(NotifyStatus {
            notifier: collab.notifier.clone(),
            cfg: cfg.clone(),
        }))
        .with_release("release-workspace", Arc::new(ReleaseWorkspace));

    let builder = Pipeline::builder().stage(unit_tests).stage(build_image);
    let builder = match cfg.test_order {
        TestOrder::E2eAfterStagePush => builder.stage(stage_push).stage(e2e_tests),
        TestOrder::E2eBeforeStagePush => builder.stage(e2e_tests).stage(stage_push),
    };

    builder
        .stage(version_tag)
        .stage(promote)
        .stage(deploy)
        .finalizer(finalizer)
        .build()
}

/// Convenience: an orchestrator over the standard delivery pipeline.
#[must_use]
pub fn delivery_orchestrator(
    cfg: &DeliveryConfig,
    collab: &Collaborators,
    secret_source: Arc<dyn SecretSource>,
    workspace_root: PathBuf,
) -> Orchestrator {
    let secret_names = cfg.secret_names();
    Orchestrator::new(
        delivery_pipeline(cfg, collab),
        secret_source,
        secret_names,
        workspace_root,
    )
}
