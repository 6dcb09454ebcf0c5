//! Secret resolution into a frozen per-run variable set.
//!
//! Resolution is all-or-nothing: it happens exactly once per run, before
//! stage 1, and any unresolvable name fails the entire run.

use crate::errors::ResolveError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// A resolved secret value.
///
/// `Debug` and `Display` are redacted so secrets never reach logs; the
/// type deliberately implements neither `Serialize` nor `Deserialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a raw secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the underlying value for handing to a collaborator.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Source of named secrets (credential store, CI environment, vault).
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetches one named secret, or `None` if the name is unknown.
    async fn fetch(&self, name: &str) -> anyhow::Result<Option<Secret>>;
}

/// An in-memory secret source, used for tests and local development.
#[derive(Debug, Default)]
pub struct StaticSecretSource {
    values: HashMap<String, Secret>,
}

impl StaticSecretSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named secret.
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), Secret::new(value));
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn fetch(&self, name: &str) -> anyhow::Result<Option<Secret>> {
        Ok(self.values.get(name).cloned())
    }
}

/// The frozen per-run variable set.
///
/// Built once before stage 1 and read-only thereafter; values computed
/// mid-run go to [`super::ComputedTags`] instead.
#[derive(Debug, Clone, Default)]
pub struct VariableSet {
    values: HashMap<String, Secret>,
}

impl VariableSet {
    /// Looks up a resolved value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Secret> {
        self.values.get(name)
    }

    /// Returns the number of resolved names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolves every requested name into a frozen [`VariableSet`].
///
/// Fails on the first unresolvable name; no partially resolved set is
/// ever observable.
pub async fn resolve(
    source: &dyn SecretSource,
    names: &[&str],
) -> Result<VariableSet, ResolveError> {
    let mut values = HashMap::with_capacity(names.len());

    for &name in names {
        let secret = source
            .fetch(name)
            .await
            .map_err(|source| ResolveError::Source {
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| ResolveError::Missing {
                name: name.to_string(),
            })?;
        values.insert(name.to_string(), secret);
    }

    Ok(VariableSet { values })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.to_string(), "***");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[tokio::test]
    async fn test_resolve_all_names() {
        let source = StaticSecretSource::new()
            .with_secret("REGISTRY_USER", "ci-bot")
            .with_secret("REGISTRY_TOKEN", "t0k3n");

        let vars = resolve(&source, &["REGISTRY_USER", "REGISTRY_TOKEN"])
            .await
            .unwrap();

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("REGISTRY_USER").unwrap().expose(), "ci-bot");
    }

    #[tokio::test]
    async fn test_resolve_missing_name_fails() {
        let source = StaticSecretSource::new().with_secret("REGISTRY_USER", "ci-bot");

        let err = resolve(&source, &["REGISTRY_USER", "DEPLOY_KEY"])
            .await
            .unwrap_err();

        assert!(matches!(err, crate::errors::ResolveError::Missing { ref name } if name == "DEPLOY_KEY"));
    }

    #[tokio::test]
    async fn test_resolve_empty_request() {
        let source = StaticSecretSource::new();
        let vars = resolve(&source, &[]).await.unwrap();
        assert!(vars.is_empty());
    }
}
