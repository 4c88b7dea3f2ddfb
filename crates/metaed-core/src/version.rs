//! Data standard and technology version matching.
//!
//! Ranges use npm-style syntax as written in plugin manifests and diminishers: `2.0.x`,
//! `>=3.0.0 <3.2.0`, `2.0.x || 3.0.x`, or a bare version meaning that exact version.

use semver::{Version, VersionReq};

/// Parses a version leniently: missing minor/patch default to zero and any pre-release or
/// build suffix is ignored. Returns `None` when no leading numeric version is present.
pub fn coerce_version(version: &str) -> Option<Version> {
    let core = version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split(['-', '+'])
        .next()?;
    let mut parts = core.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().unwrap_or(Ok(0)).ok()?;
    let patch = parts.next().unwrap_or(Ok(0)).ok()?;
    Some(Version::new(major, minor, patch))
}

fn is_bare_version(comparator: &str) -> bool {
    comparator.starts_with(|c: char| c.is_ascii_digit())
        && !comparator.contains(['x', 'X', '*'])
}

/// Converts one npm-style comparator set into a `semver::VersionReq`.
fn parse_range(range: &str) -> Option<VersionReq> {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in range.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let comparator = format!("{pending_op}{token}");
        pending_op.clear();
        if is_bare_version(&comparator) {
            comparators.push(format!("={comparator}"));
        } else {
            comparators.push(comparator);
        }
    }
    if comparators.is_empty() {
        return None;
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Whether `version` falls in any `||`-separated alternative of `range`.
///
/// An unparsable version or range never matches.
pub fn version_satisfies(version: &str, range: &str) -> bool {
    let Some(version) = coerce_version(version) else {
        return false;
    };
    range
        .split("||")
        .filter_map(|alternative| parse_range(alternative.trim()))
        .any(|req| req.matches(&version))
}

/// Drops a pre-release suffix (`3.1.0-pre.1` to `3.1.0`) when suppression is on.
pub fn format_version_with_suppress_prerelease(version: &str, suppress: bool) -> String {
    if !suppress {
        return version.to_string();
    }
    match version.split_once('-') {
        Some((core, _)) => core.to_string(),
        None => version.to_string(),
    }
}
