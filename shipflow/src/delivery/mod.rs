//! The concrete continuous-delivery pipeline: build, test, promote,
//! deploy.
//!
//! External collaborators (the build toolchain, the registries, the test
//! runner, the deployment-config repository, the notification transport)
//! are trait objects; this module owns only the orchestration contract
//! between them.

mod collaborators;
mod config;
mod deploy_config;
mod stages;
mod workspace;

#[cfg(test)]
mod integration_tests;

pub use collaborators::{
    Collaborators, DeployConfigRepo, E2eParams, ImageBuilder, ImageRegistry, Notifier,
    TestRunner, VersionResolver,
};
pub use config::{registry_address, DeliveryConfig, TestOrder};
pub use deploy_config::{commit_message, rewrite_tag};
pub use stages::{delivery_orchestrator, delivery_pipeline};
pub use workspace::{checkout_dir, ReleaseWorkspace, RemoveCheckout};
