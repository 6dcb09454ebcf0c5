//! Run-scoped context: the frozen variable set and the mutable,
//! single-writer computed tags.

mod run_context;
mod variables;

pub use run_context::{ComputedTags, RunContext};
pub use variables::{resolve, Secret, SecretSource, StaticSecretSource, VariableSet};
