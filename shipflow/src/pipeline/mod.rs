//! The pipeline orchestration state machine.
//!
//! A pipeline is a fixed, ordered sequence of conditionally-executed
//! stages followed by an always-run finalization phase. The sequencer
//! halts forward progress on the first stage failure without aborting
//! finalization.

mod action;
mod condition;
mod finalizer;
mod guard;
mod orchestrator;
mod sequencer;

pub use action::{Action, FnAction};
pub use condition::{BranchPattern, RunCondition};
pub use finalizer::{Finalizer, FinalizerStep};
pub use guard::{Guard, GuardedAction};
pub use orchestrator::{Orchestrator, Pipeline, PipelineBuilder};
pub use sequencer::{Sequencer, StageDef};
