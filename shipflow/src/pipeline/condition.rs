//! Branch- and result-based stage gating.

use crate::core::RunResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A branch name pattern: either an exact name or a `prefix/*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BranchPattern {
    /// Matches exactly one branch name.
    Exact(String),
    /// Matches any branch under the prefix, e.g. `feature/*`.
    Prefix(String),
}

impl BranchPattern {
    /// Parses a pattern string; a trailing `/*` makes it a prefix match.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        pattern
            .strip_suffix("/*")
            .map_or_else(
                || Self::Exact(pattern.to_string()),
                |prefix| Self::Prefix(format!("{prefix}/")),
            )
    }

    /// Returns true if the branch name matches this pattern.
    #[must_use]
    pub fn matches(&self, branch: &str) -> bool {
        match self {
            Self::Exact(name) => branch == name,
            Self::Prefix(prefix) => branch.starts_with(prefix.as_str()),
        }
    }
}

impl From<String> for BranchPattern {
    fn from(pattern: String) -> Self {
        Self::parse(&pattern)
    }
}

impl From<BranchPattern> for String {
    fn from(pattern: BranchPattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for BranchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "{name}"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// The run-condition for a stage: a pure predicate over the branch name
/// and the run's aggregate result so far.
///
/// Skipping a stage whose condition is not met is not a failure and does
/// not alter the aggregate result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCondition {
    /// Branch patterns; the stage runs if any matches.
    pub branches: Vec<BranchPattern>,
    /// When set, the stage additionally requires that no earlier stage in
    /// the same run has failed. Production-affecting stages set this
    /// instead of re-checking stage names.
    pub require_prior_ok: bool,
}

impl RunCondition {
    /// A condition matching the given branch patterns.
    #[must_use]
    pub fn branches<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            branches: patterns
                .into_iter()
                .map(|p| BranchPattern::parse(p.as_ref()))
                .collect(),
            require_prior_ok: false,
        }
    }

    /// A condition matching every branch.
    #[must_use]
    pub fn any_branch() -> Self {
        Self {
            branches: vec![BranchPattern::Prefix(String::new())],
            require_prior_ok: false,
        }
    }

    /// Additionally requires a clean run so far.
    #[must_use]
    pub fn with_prior_ok(mut self) -> Self {
        self.require_prior_ok = true;
        self
    }

    /// Evaluates the condition. Pure: same inputs, same answer.
    #[must_use]
    pub fn is_met(&self, branch: &str, prior: RunResult) -> bool {
        if self.require_prior_ok && !prior.is_ok() {
            return false;
        }
        self.branches.iter().any(|p| p.matches(branch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_parse() {
        assert_eq!(BranchPattern::parse("main"), BranchPattern::Exact("main".to_string()));
        assert_eq!(
            BranchPattern::parse("feature/*"),
            BranchPattern::Prefix("feature/".to_string())
        );
    }

    #[test]
    fn test_exact_match() {
        let pattern = BranchPattern::parse("main");
        assert!(pattern.matches("main"));
        assert!(!pattern.matches("main-old"));
        assert!(!pattern.matches("feature/main"));
    }

    #[test]
    fn test_prefix_match() {
        let pattern = BranchPattern::parse("release/*");
        assert!(pattern.matches("release/1.2"));
        assert!(!pattern.matches("release"));
        assert!(!pattern.matches("feature/release"));
    }

    #[test]
    fn test_condition_truth_table() {
        let broad = RunCondition::branches(["main", "feature/*", "release/*"]);
        let narrow = RunCondition::branches(["main", "release/*"]).with_prior_ok();

        for (branch, broad_met, narrow_met) in [
            ("main", true, true),
            ("feature/x", true, false),
            ("release/2.0", true, true),
            ("hotfix/x", false, false),
        ] {
            assert_eq!(broad.is_met(branch, RunResult::Pending), broad_met, "{branch}");
            assert_eq!(narrow.is_met(branch, RunResult::Pending), narrow_met, "{branch}");
        }
    }

    #[test]
    fn test_prior_ok_gating() {
        let narrow = RunCondition::branches(["main"]).with_prior_ok();

        assert!(narrow.is_met("main", RunResult::Pending));
        assert!(narrow.is_met("main", RunResult::Success));
        assert!(!narrow.is_met("main", RunResult::Failure));

        // Without the gate, a prior failure does not block evaluation.
        let broad = RunCondition::branches(["main"]);
        assert!(broad.is_met("main", RunResult::Failure));
    }

    #[test]
    fn test_any_branch() {
        let any = RunCondition::any_branch();
        assert!(any.is_met("main", RunResult::Pending));
        assert!(any.is_met("weird-branch-name", RunResult::Failure));
    }

    #[test]
    fn test_pattern_serde_round_trip() {
        let pattern = BranchPattern::parse("feature/*");
        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, "\"feature/*\"");
        let back: BranchPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }
}
