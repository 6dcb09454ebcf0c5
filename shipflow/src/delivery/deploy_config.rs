//! Rewriting the deployment-config manifest.
//!
//! A single `tag:` line within one bounded top-level block is rewritten to
//! the new semantic version. Everything else in the file, including tag
//! fields of other blocks, is left byte-identical.

use anyhow::{bail, Context};
use regex::Regex;

/// Rewrites the tag field inside the named top-level block.
///
/// Returns `Ok(None)` when the file already carries the version (no
/// textual diff, so no commit should follow).
///
/// # Errors
///
/// Fails when the block or the tag field cannot be located; a manifest
/// that does not match the configured shape must fail the deploy stage
/// rather than push an unrelated edit.
pub fn rewrite_tag(
    content: &str,
    block: &str,
    field: &str,
    version: &str,
) -> anyhow::Result<Option<String>> {
    let field_re = Regex::new(&format!(
        r#"^(\s*{}:\s*")([^"]*)(".*)$"#,
        regex::escape(field)
    ))
    .context("invalid tag field pattern")?;

    let mut lines: Vec<String> = Vec::with_capacity(content.lines().count());
    let mut in_block = false;
    let mut rewrote = false;
    let mut changed = false;

    for line in content.lines() {
        if !rewrote && !line.starts_with([' ', '\t']) && !line.trim().is_empty() {
            in_block = line.trim_end() == format!("{block}:");
            lines.push(line.to_string());
            continue;
        }

        if in_block && !rewrote {
            if let Some(caps) = field_re.captures(line) {
                rewrote = true;
                if &caps[2] != version {
                    changed = true;
                    lines.push(format!("{}{}{}", &caps[1], version, &caps[3]));
                    continue;
                }
            }
        }

        lines.push(line.to_string());
    }

    if !rewrote {
        bail!("manifest has no '{field}' field inside block '{block}'");
    }

    if !changed {
        return Ok(None);
    }

    let mut out = lines.join("\n");
    if content.ends_with('\n') {
        out.push('\n');
    }
    Ok(Some(out))
}

/// Deterministic commit message embedding version and build number.
#[must_use]
pub fn commit_message(block: &str, version: &str, build_number: u64) -> String {
    format!("deploy: {block} {version} (build {build_number})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = "\
replicas: 2
backend:
  image:
    repository: apps/backend
    tag: \"1.1.0\"
frontend:
  image:
    repository: apps/frontend
    tag: \"2.0.0\"
";

    #[test]
    fn test_rewrites_only_the_targeted_block() {
        let out = rewrite_tag(MANIFEST, "backend", "tag", "1.2.0")
            .unwrap()
            .unwrap();

        assert!(out.contains("tag: \"1.2.0\""));
        // The frontend block is untouched.
        assert!(out.contains("tag: \"2.0.0\""));
        assert_eq!(out.matches("1.2.0").count(), 1);
    }

    #[test]
    fn test_identical_version_is_a_noop() {
        let out = rewrite_tag(MANIFEST, "backend", "tag", "1.1.0").unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_preserves_everything_else() {
        let out = rewrite_tag(MANIFEST, "backend", "tag", "1.2.0")
            .unwrap()
            .unwrap();
        let expected = MANIFEST.replace("\"1.1.0\"", "\"1.2.0\"");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_missing_block_fails() {
        let err = rewrite_tag(MANIFEST, "worker", "tag", "1.2.0").unwrap_err();
        assert!(err.to_string().contains("worker"));
    }

    #[test]
    fn test_missing_field_fails() {
        let manifest = "backend:\n  image:\n    repository: apps/backend\n";
        assert!(rewrite_tag(manifest, "backend", "tag", "1.2.0").is_err());
    }

    #[test]
    fn test_second_matching_line_is_left_alone() {
        let manifest = "\
backend:
  image:
    tag: \"1.0.0\"
  canary:
    tag: \"1.0.0\"
";
        let out = rewrite_tag(manifest, "backend", "tag", "9.9.9")
            .unwrap()
            .unwrap();
        assert_eq!(out.matches("9.9.9").count(), 1);
        assert_eq!(out.matches("\"1.0.0\"").count(), 1);
    }

    #[test]
    fn test_commit_message_format() {
        assert_eq!(
            commit_message("backend", "1.2.0", 42),
            "deploy: backend 1.2.0 (build 42)"
        );
    }
}
