//! End-to-end scenarios for the standard delivery pipeline, driven
//! entirely through mock collaborators.

use super::{delivery_orchestrator, registry_address, DeliveryConfig};
use crate::context::StaticSecretSource;
use crate::core::{PushEvent, RunResult};
use crate::pipeline::Orchestrator;
use crate::testing::{mock_collaborators, MockHandles};
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;

const STAGING_ACCOUNT: &str = "111111111111";
const PRODUCTION_ACCOUNT: &str = "222222222222";

struct Harness {
    handles: MockHandles,
    orchestrator: Orchestrator,
    cfg: DeliveryConfig,
    _root: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with(DeliveryConfig::default())
}

fn harness_with(cfg: DeliveryConfig) -> Harness {
    let (handles, collab) = mock_collaborators();
    let source = StaticSecretSource::new()
        .with_secret(&cfg.staging_account_var, STAGING_ACCOUNT)
        .with_secret(&cfg.production_account_var, PRODUCTION_ACCOUNT)
        .with_secret(&cfg.registry_user_var, "ci-bot")
        .with_secret(&cfg.registry_token_var, "t0k3n");

    let root = tempfile::tempdir().unwrap();
    let orchestrator = delivery_orchestrator(
        &cfg,
        &collab,
        Arc::new(source),
        root.path().to_path_buf(),
    );

    Harness {
        handles,
        orchestrator,
        cfg,
        _root: root,
    }
}

fn staging_registry(cfg: &DeliveryConfig) -> String {
    registry_address(STAGING_ACCOUNT, &cfg.region)
}

fn production_registry(cfg: &DeliveryConfig) -> String {
    registry_address(PRODUCTION_ACCOUNT, &cfg.region)
}

#[tokio::test]
async fn scenario_a_main_push_promotes_and_deploys() {
    let h = harness();

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    assert_eq!(record.result, RunResult::Success);
    let build = record.id.build_number;

    // Staged under the build number, promoted under version and latest.
    let pushes = h.handles.registry.pushes.lock().clone();
    let staging = staging_registry(&h.cfg);
    let production = production_registry(&h.cfg);
    let tags: Vec<String> = pushes.iter().map(ToString::to_string).collect();
    assert_eq!(
        tags,
        vec![
            format!("{staging}/backend:{build}"),
            format!("{production}/backend:1.2.0"),
            format!("{production}/backend:latest"),
        ]
    );

    // The staged artifact was re-fetched before promotion.
    let pulls = h.handles.registry.pulls.lock().clone();
    assert_eq!(pulls.len(), 1);
    assert_eq!(pulls[0].tag, build.to_string());

    // Manifest rewritten and committed with a deterministic message.
    assert!(h.handles.deploy_repo.manifest.lock().contains("tag: \"1.2.0\""));
    assert_eq!(
        h.handles.deploy_repo.commits.lock().clone(),
        vec![format!("deploy: backend 1.2.0 (build {build})")]
    );

    // Exactly one success notification with the run link.
    let notes = h.handles.notifier.notes.lock().clone();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].result, RunResult::Success);
    assert_eq!(notes[0].run_link, h.cfg.run_link(build));

    // Cleanup ran.
    assert_eq!(h.handles.builder.removed.lock().clone(), vec![build]);
    assert_eq!(h.handles.builder.prunes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scenario_b_feature_branch_stops_before_production() {
    let h = harness();

    let record = h.orchestrator.execute(PushEvent::new("feature/x")).await;
    assert_eq!(record.result, RunResult::Success);

    // Built, staged and e2e-tested, but never versioned, promoted or
    // deployed.
    assert_eq!(h.handles.builder.builds.lock().len(), 1);
    assert_eq!(h.handles.registry.pushes.lock().len(), 1);
    assert_eq!(h.handles.tests.e2e_calls.lock().len(), 1);
    assert_eq!(h.handles.versions.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.handles.registry.pulls.lock().len(), 0);
    assert_eq!(h.handles.deploy_repo.clones.load(Ordering::SeqCst), 0);

    let notes = h.handles.notifier.notes.lock().clone();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].result, RunResult::Success);
}

#[tokio::test]
async fn scenario_c_unit_failure_halts_everything_downstream() {
    let h = harness();
    h.handles.tests.fail_unit();

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    assert_eq!(record.result, RunResult::Failure);

    assert!(h.handles.builder.builds.lock().is_empty());
    assert!(h.handles.registry.pushes.lock().is_empty());
    assert_eq!(h.handles.versions.calls.load(Ordering::SeqCst), 0);

    // Cleanup still ran and exactly one failure notification went out.
    assert_eq!(h.handles.builder.removed.lock().len(), 1);
    let notes = h.handles.notifier.notes.lock().clone();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].result, RunResult::Failure);
}

#[tokio::test]
async fn unmatched_branch_skips_every_stage_but_still_finalizes() {
    let h = harness();

    let record = h.orchestrator.execute(PushEvent::new("hotfix/oops")).await;
    assert_eq!(record.result, RunResult::Success);

    assert_eq!(h.handles.tests.unit_calls.load(Ordering::SeqCst), 0);
    assert!(h.handles.builder.builds.lock().is_empty());
    assert_eq!(h.handles.notifier.notes.lock().len(), 1);
}

#[tokio::test]
async fn transient_push_failures_are_retried_to_success() {
    let h = harness();
    h.handles.registry.fail_next_pushes(2);

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    assert_eq!(record.result, RunResult::Success);

    // Two failed attempts plus the success, then the two promotion pushes.
    assert_eq!(h.handles.registry.pushes.lock().len(), 5);
}

#[tokio::test]
async fn exhausted_push_retries_fail_the_run() {
    let h = harness();
    h.handles.registry.fail_next_pushes(DeliveryConfig::default().registry_attempts);

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    assert_eq!(record.result, RunResult::Failure);

    // Nothing downstream of the staging push ran.
    assert_eq!(h.handles.versions.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.handles.deploy_repo.clones.load(Ordering::SeqCst), 0);
    assert_eq!(h.handles.notifier.notes.lock().len(), 1);
}

#[tokio::test]
async fn e2e_failure_still_archives_the_report() {
    let h = harness();
    h.handles.tests.fail_e2e();

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    assert_eq!(record.result, RunResult::Failure);

    assert_eq!(h.handles.tests.archives.load(Ordering::SeqCst), 1);
    assert_eq!(h.handles.versions.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn already_current_manifest_produces_no_commit() {
    let h = harness();
    *h.handles.versions.version.lock() = "1.1.0".to_string();

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    assert_eq!(record.result, RunResult::Success);

    assert_eq!(h.handles.deploy_repo.clones.load(Ordering::SeqCst), 1);
    assert!(h.handles.deploy_repo.commits.lock().is_empty());
}

#[tokio::test]
async fn notification_failure_does_not_change_the_run_result() {
    let h = harness();
    h.handles.notifier.fail_delivery();

    let record = h.orchestrator.execute(PushEvent::new("main")).await;

    assert_eq!(record.result, RunResult::Success);
    assert_eq!(h.handles.notifier.notes.lock().len(), 1);
}

#[tokio::test]
async fn e2e_before_push_order_gates_the_staging_push() {
    let h = harness_with(DeliveryConfig {
        test_order: super::TestOrder::E2eBeforeStagePush,
        ..DeliveryConfig::default()
    });
    h.handles.tests.fail_e2e();

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    assert_eq!(record.result, RunResult::Failure);

    // With the swapped order, a failing e2e suite means nothing was ever
    // pushed to staging.
    assert!(h.handles.registry.pushes.lock().is_empty());
}

#[tokio::test]
async fn e2e_runner_receives_the_staged_image_set() {
    let h = harness();

    let record = h.orchestrator.execute(PushEvent::new("main")).await;
    let build = record.id.build_number;

    let calls = h.handles.tests.e2e_calls.lock().clone();
    assert_eq!(calls.len(), 1);
    let params = &calls[0];
    assert_eq!(params.backend_image.tag, build.to_string());
    assert_eq!(params.frontend_image.tag, "latest");
    assert_eq!(params.worker_image.tag, "latest");
    assert_eq!(params.notify_address, h.cfg.e2e_notify_address);
}
