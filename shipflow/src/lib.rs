//! # Shipflow
//!
//! A declarative continuous-delivery pipeline orchestrator.
//!
//! Given a source-control push event, shipflow drives a fixed, ordered
//! sequence of stages — build a container image, test it, promote it
//! from a staging registry to a production registry, and update a
//! deployment-config repository to trigger a cluster rollout — with:
//!
//! - **Conditional gating**: each stage runs only when its branch
//!   pattern matches and, for production-affecting stages, only when no
//!   earlier stage has failed
//! - **Guarded actions**: flaky external calls wrapped with optional
//!   timeout and bounded, repeat-safe retry
//! - **Frozen variables**: secrets and build metadata resolved
//!   all-or-nothing before the first stage, read-only afterwards
//! - **Guaranteed finalization**: best-effort cleanup and exactly one
//!   status notification on every exit path
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shipflow::prelude::*;
//!
//! let cfg = DeliveryConfig::default();
//! let orchestrator = delivery_orchestrator(
//!     &cfg,
//!     &collaborators,
//!     secret_source,
//!     workspace_root,
//! );
//!
//! let record = orchestrator.execute(PushEvent::new("main")).await;
//! ```
//!
//! The container build toolchain, the registries, the test runner, the
//! deployment-config repository and the notification transport are all
//! trait objects in [`delivery`]; the crate specifies only the contract
//! it expects from each.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod core;
pub mod delivery;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{
        resolve, ComputedTags, RunContext, Secret, SecretSource, StaticSecretSource, VariableSet,
    };
    pub use crate::core::{ImageRef, PushEvent, RunId, RunNotification, RunRecord, RunResult};
    pub use crate::delivery::{
        delivery_orchestrator, delivery_pipeline, Collaborators, DeliveryConfig,
        DeployConfigRepo, E2eParams, ImageBuilder, ImageRegistry, Notifier, TestOrder,
        TestRunner, VersionResolver,
    };
    pub use crate::errors::{
        ContextError, GuardError, ResolveError, ShipflowError, StageError,
    };
    pub use crate::pipeline::{
        Action, BranchPattern, Finalizer, FnAction, Guard, GuardedAction, Orchestrator,
        Pipeline, PipelineBuilder, RunCondition, Sequencer, StageDef,
    };
}
