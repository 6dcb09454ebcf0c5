//! Delivery pipeline configuration.
//!
//! Branch-gating breadth and the placement of the e2e suite relative to
//! the staging push differ between deployments, so both are configuration
//! rather than hardcoded.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed path segment appended to every composed registry address.
const REGISTRY_PATH_SEGMENT: &str = "apps";

/// Composes a registry address from resolved primitives.
///
/// Pure and side-effect-free; called with values from the frozen
/// variable set.
#[must_use]
pub fn registry_address(account_id: &str, region: &str) -> String {
    format!("{account_id}.registry.{region}.amazonaws.com/{REGISTRY_PATH_SEGMENT}")
}

/// Whether the e2e suite runs before or after the staging push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOrder {
    /// Push to staging first, then run e2e against the staged image.
    #[default]
    E2eAfterStagePush,
    /// Run e2e against the locally built image, then push to staging.
    E2eBeforeStagePush,
}

/// Configuration for the standard delivery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Backend image repository name.
    pub backend_repository: String,
    /// Frontend companion repository (e2e parameter).
    pub frontend_repository: String,
    /// Worker companion repository (e2e parameter).
    pub worker_repository: String,
    /// Registry region, composed into addresses.
    pub region: String,
    /// Variable name holding the staging registry account id.
    pub staging_account_var: String,
    /// Variable name holding the production registry account id.
    pub production_account_var: String,
    /// Variable name holding the registry username.
    pub registry_user_var: String,
    /// Variable name holding the registry token.
    pub registry_token_var: String,
    /// Branches eligible for build and test stages.
    pub broad_branches: Vec<String>,
    /// Branches eligible for the production-affecting stages.
    pub release_branches: Vec<String>,
    /// Placement of the e2e suite relative to the staging push.
    pub test_order: TestOrder,
    /// Path of the manifest file inside the deployment-config checkout.
    pub manifest_path: String,
    /// Top-level manifest block containing the image tag.
    pub manifest_block: String,
    /// The tag field name within the block.
    pub manifest_tag_field: String,
    /// Address the e2e runner reports progress to.
    pub e2e_notify_address: String,
    /// Base URL for run reference links.
    pub run_link_base: String,
    /// Per-attempt bound for registry pushes and pulls.
    pub registry_timeout: Duration,
    /// Completion bound for the e2e suite.
    pub e2e_timeout: Duration,
    /// Total attempts for repeat-safe registry calls.
    pub registry_attempts: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            backend_repository: "backend".to_string(),
            frontend_repository: "frontend".to_string(),
            worker_repository: "worker".to_string(),
            region: "eu-west-1".to_string(),
            staging_account_var: "STAGING_ACCOUNT_ID".to_string(),
            production_account_var: "PRODUCTION_ACCOUNT_ID".to_string(),
            registry_user_var: "REGISTRY_USER".to_string(),
            registry_token_var: "REGISTRY_TOKEN".to_string(),
            broad_branches: vec![
                "main".to_string(),
                "feature/*".to_string(),
                "release/*".to_string(),
            ],
            release_branches: vec!["main".to_string(), "release/*".to_string()],
            test_order: TestOrder::default(),
            manifest_path: "values.yaml".to_string(),
            manifest_block: "backend".to_string(),
            manifest_tag_field: "tag".to_string(),
            e2e_notify_address: "ci-reports@example.com".to_string(),
            run_link_base: "https://ci.example.com/runs".to_string(),
            registry_timeout: Duration::from_secs(300),
            e2e_timeout: Duration::from_secs(1800),
            registry_attempts: 3,
        }
    }
}

impl DeliveryConfig {
    /// The secret names the resolver must supply before stage 1.
    #[must_use]
    pub fn secret_names(&self) -> Vec<String> {
        vec![
            self.staging_account_var.clone(),
            self.production_account_var.clone(),
            self.registry_user_var.clone(),
            self.registry_token_var.clone(),
        ]
    }

    /// Reference link for a build number.
    #[must_use]
    pub fn run_link(&self, build_number: u64) -> String {
        format!("{}/{}", self.run_link_base, build_number)
    }
}
