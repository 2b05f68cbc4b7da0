//! Version comparison for host and blueprint compatibility
//!
//! Blueprints declare the host versions they support with npm-style ranges.
//! These are translated into `semver::VersionReq` alternatives.

use anyhow::Result;
use semver::{BuildMetadata, Comparator, Op, Version, VersionReq};
use std::cmp::Ordering;

/// Parse version string, handling a leading `v`
pub fn parse_version(version_str: &str) -> Result<Version> {
    let cleaned = version_str.trim();
    let cleaned = cleaned.strip_prefix('v').unwrap_or(cleaned);
    Version::parse(cleaned).map_err(|e| anyhow::anyhow!("Invalid version '{}': {}", version_str, e))
}

/// `a < b`; `None` when either side is not a version
pub fn less_than(a: &str, b: &str) -> Option<bool> {
    Some(parse_version(a).ok()? < parse_version(b).ok()?)
}

/// An npm range: any alternative may match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Translate an npm range. `None` for specifiers that are not ranges
    /// (git urls, `workspace:` protocols, dist-tags).
    pub fn parse(range: &str) -> Option<Self> {
        let alternatives = range
            .split("||")
            .map(translate_alternative)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { alternatives })
    }

    /// Whether `version` satisfies the range.
    ///
    /// With `include_prerelease`, prerelease versions are ordered against
    /// every comparator instead of only those on the same release triple:
    /// `8.1.0-beta.1` satisfies `^8.0.0`, `8.0.0-rc.1` does not satisfy
    /// `>=8.0.0`.
    pub fn satisfies(&self, version: &Version, include_prerelease: bool) -> bool {
        if include_prerelease && !version.pre.is_empty() {
            self.alternatives
                .iter()
                .any(|req| req.comparators.iter().all(|c| comparator_admits(c, version)))
        } else {
            self.alternatives.iter().any(|req| req.matches(version))
        }
    }
}

/// Precedence order, build metadata ignored
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// One comparator under full precedence ordering. Exclusive upper bounds
/// are compared on the release triple, which also excludes every
/// prerelease of the bound itself.
fn comparator_admits(comparator: &Comparator, version: &Version) -> bool {
    let triple = (version.major, version.minor, version.patch);
    let major = comparator.major;
    let full = comparator.minor.is_some() && comparator.patch.is_some();
    let floor = Version {
        major,
        minor: comparator.minor.unwrap_or(0),
        patch: comparator.patch.unwrap_or(0),
        pre: comparator.pre.clone(),
        build: BuildMetadata::EMPTY,
    };
    let above_floor = precedence(version, &floor) != Ordering::Less;
    let past_written = match (comparator.minor, comparator.patch) {
        (None, _) => (major + 1, 0, 0),
        (Some(minor), None) => (major, minor + 1, 0),
        (Some(minor), Some(patch)) => (major, minor, patch + 1),
    };

    match comparator.op {
        Op::Exact | Op::Wildcard if full => precedence(version, &floor) == Ordering::Equal,
        Op::Exact | Op::Wildcard => above_floor && triple < past_written,
        Op::Greater if full => precedence(version, &floor) == Ordering::Greater,
        Op::Greater => triple >= past_written,
        Op::GreaterEq => above_floor,
        Op::Less if full => precedence(version, &floor) == Ordering::Less,
        Op::Less => triple < (floor.major, floor.minor, floor.patch),
        Op::LessEq if full => precedence(version, &floor) != Ordering::Greater,
        Op::LessEq => triple < past_written,
        Op::Tilde => {
            let upper = match comparator.minor {
                Some(minor) => (major, minor + 1, 0),
                None => (major + 1, 0, 0),
            };
            above_floor && triple < upper
        }
        Op::Caret => {
            let upper = match (comparator.minor, comparator.patch) {
                _ if major > 0 => (major + 1, 0, 0),
                (None, _) => (1, 0, 0),
                (Some(minor), _) if minor > 0 => (0, minor + 1, 0),
                (Some(_), None) => (0, 1, 0),
                (Some(_), Some(patch)) => (0, 0, patch + 1),
            };
            above_floor && triple < upper
        }
        _ => false,
    }
}

fn is_operator(token: &str) -> bool {
    matches!(token, "=" | "<" | ">" | "<=" | ">=" | "^" | "~" | "~>")
}

fn split_operator(token: &str) -> (&str, &str) {
    let end = token
        .find(|c: char| !matches!(c, '=' | '<' | '>' | '^' | '~'))
        .unwrap_or(token.len());
    token.split_at(end)
}

/// One comparator in semver-crate syntax
fn translate_comparator(token: &str) -> Option<String> {
    let (op, version) = split_operator(token);
    let op = if op == "~>" { "~" } else { op };
    let version = version.strip_prefix('v').unwrap_or(version);
    if version.is_empty() {
        return None;
    }
    if matches!(version, "*" | "x" | "X") {
        return Some("*".to_string());
    }

    let core = version.split(['-', '+']).next().unwrap_or(version);
    let parts = core.split('.').count();
    let wildcard = core.split('.').any(|p| matches!(p, "x" | "X" | "*"));
    if !op.is_empty() {
        return Some(format!("{}{}", op, version));
    }
    if parts == 3 && !wildcard {
        // npm treats a bare full version as exact
        return Some(format!("={}", version));
    }
    if wildcard {
        let mut segments: Vec<&str> = core
            .split('.')
            .take_while(|p| !matches!(*p, "x" | "X" | "*"))
            .collect();
        segments.push("*");
        return Some(segments.join("."));
    }
    Some(format!("{}.*", version))
}

fn translate_alternative(alternative: &str) -> Option<VersionReq> {
    let alternative = alternative.trim();
    if alternative.is_empty() || matches!(alternative, "*" | "x" | "X") {
        return Some(VersionReq::STAR);
    }

    let comparators = match alternative.split_once(" - ") {
        Some((low, high)) => vec![
            format!(">={}", low.trim().trim_start_matches('v')),
            format!("<={}", high.trim().trim_start_matches('v')),
        ],
        None => {
            let mut comparators = Vec::new();
            let mut pending_op: Option<&str> = None;
            for token in alternative.split_whitespace() {
                if is_operator(token) {
                    pending_op = Some(token);
                    continue;
                }
                let merged = match pending_op.take() {
                    Some(op) => format!("{}{}", op, token),
                    None => token.to_string(),
                };
                comparators.push(translate_comparator(&merged)?);
            }
            if pending_op.is_some() {
                return None;
            }
            comparators
        }
    };

    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Outcome of checking a blueprint's declared host range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    Incompatible,
    /// The declared specifier is not a version range
    Unparsable,
}

/// Check the host's running version against a declared range.
pub fn check_compatibility(host_version: &Version, range: &str) -> Compatibility {
    match NpmRange::parse(range) {
        Some(parsed) => {
            if parsed.satisfies(host_version, !host_version.pre.is_empty()) {
                Compatibility::Compatible
            } else {
                Compatibility::Incompatible
            }
        }
        None => Compatibility::Unparsable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_exact_version_excludes_other_versions() {
        assert_eq!(
            check_compatibility(&v("9.9.9"), "1.1.1"),
            Compatibility::Incompatible
        );
        assert_eq!(
            check_compatibility(&v("1.1.1"), "1.1.1"),
            Compatibility::Compatible
        );
    }

    #[test]
    fn test_common_ranges() {
        let cases = [
            ("^8.0.0", "8.3.1", true),
            ("^8.0.0", "9.0.0", false),
            ("~8.1", "8.1.9", true),
            ("~8.1", "8.2.0", false),
            (">=7 <9", "8.0.0", true),
            (">= 7 < 9", "9.0.0", false),
            ("7.x", "7.4.0", true),
            ("7", "7.4.0", true),
            ("7", "8.0.0", false),
            ("1.0.0 - 2.0.0", "2.0.0", true),
            ("1.0.0 - 2.0.0", "2.0.1", false),
            ("^1.0.0 || ^3.0.0", "3.2.0", true),
            ("^1.0.0 || ^3.0.0", "2.2.0", false),
            ("*", "0.0.1", true),
            ("v1.2.3", "1.2.3", true),
        ];
        for (range, version, expected) in cases {
            let parsed = NpmRange::parse(range).unwrap_or_else(|| panic!("{} should parse", range));
            assert_eq!(
                parsed.satisfies(&v(version), false),
                expected,
                "{} against {}",
                version,
                range
            );
        }
    }

    #[test]
    fn test_prerelease_host() {
        let host = v("8.1.0-beta.2");
        let range = NpmRange::parse("^8.0.0").unwrap();
        assert!(!range.satisfies(&host, false));
        assert!(range.satisfies(&host, true));
        assert_eq!(check_compatibility(&host, "^8.0.0"), Compatibility::Compatible);
    }

    #[test]
    fn test_prerelease_orders_below_its_release() {
        let cases = [
            (">=8.0.0", "8.0.0-rc.1", false),
            ("^8.0.0", "8.0.0-beta.2", false),
            ("^8.0.0", "9.0.0-rc.1", false),
            ("<9.0.0", "9.0.0-rc.1", true),
            ("^8.0.0-beta.1", "8.0.0-beta.2", true),
            ("~8.1", "8.1.4-alpha", true),
            ("8.x", "8.3.0-next.0", true),
            ("^0.2.0", "0.2.5-rc.0", true),
            ("^0.2.0", "0.3.0-rc.0", false),
            ("1.0.0 - 2.0.0", "2.0.0-rc.1", true),
            ("*", "0.1.0-dev", true),
        ];
        for (range, version, expected) in cases {
            let parsed = NpmRange::parse(range).unwrap();
            assert_eq!(
                parsed.satisfies(&v(version), true),
                expected,
                "{} against {}",
                version,
                range
            );
        }
    }

    #[test]
    fn test_unparsable_specifiers() {
        assert_eq!(
            check_compatibility(&v("1.0.0"), "github:acme/generator-forge"),
            Compatibility::Unparsable
        );
        assert_eq!(
            check_compatibility(&v("1.0.0"), "workspace:*"),
            Compatibility::Unparsable
        );
        assert!(NpmRange::parse(">=").is_none());
    }

    #[test]
    fn test_parse_version_and_less_than() {
        assert_eq!(parse_version("v1.2.3").unwrap(), v("1.2.3"));
        assert!(parse_version("invalid").is_err());
        assert_eq!(less_than("0.1.0", "0.2.0"), Some(true));
        assert_eq!(less_than("0.2.0", "0.1.0"), Some(false));
        assert_eq!(less_than("invalid", "0.1.0"), None);
    }
}
