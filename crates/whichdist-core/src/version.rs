//! Version strings and their ordering.
//!
//! The ordering is deliberately simpler than full PEP 440: versions are
//! compared as dot-separated segments, numerically where both segments parse
//! as integers and lexically otherwise, with a shorter version ordering
//! before a longer one that it prefixes. This mirrors how "latest" is picked
//! from repository file listings; it is not a constraint solver.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A distribution version as published to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionString {
    raw: String,
}

impl VersionString {
    /// Create from a raw version string.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            raw: version.into(),
        }
    }

    /// Get the raw version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this looks like a pre-release or development version.
    ///
    /// Any segment carrying an ASCII alphabetic character counts: `2.1.0rc1`,
    /// `1.0a2`, `3.0.dev4`. Post releases like `1.0.post1` are swept up by
    /// the same rule, which keeps the check total and cheap.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.raw
            .split('.')
            .any(|seg| seg.chars().any(|c| c.is_ascii_alphabetic()))
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }
}

impl Ord for VersionString {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.segments();
        let mut right = other.segments();
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) => {
                    let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                        (Ok(x), Ok(y)) => x.cmp(&y),
                        _ => a.cmp(b),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                // Segment-equal versions fall back to the raw spelling so the
                // order stays consistent with Eq ("1.0" vs "1.00").
                (None, None) => return self.raw.cmp(&other.raw),
            }
        }
    }
}

impl PartialOrd for VersionString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for VersionString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for VersionString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionString {
        VersionString::new(s)
    }

    #[test]
    fn numeric_ordering() {
        assert!(v("2.1.0") > v("2.0.0"));
        assert!(v("2.10.0") > v("2.9.0"));
        assert!(v("0.9") < v("0.10"));
    }

    #[test]
    fn prefix_orders_before_extension() {
        assert!(v("2.1") < v("2.1.0"));
        assert!(v("1") < v("1.0.0"));
    }

    #[test]
    fn lexical_fallback_for_non_numeric_segments() {
        // "0rc1" does not parse as an integer, so it compares lexically
        // against "0" and sorts after the plain release segment.
        assert!(v("2.1.0rc1") > v("2.1.0"));
        assert!(v("2.1.0rc1") < v("2.1.1"));
    }

    #[test]
    fn prerelease_detection() {
        assert!(v("2.1.0rc1").is_prerelease());
        assert!(v("1.0a2").is_prerelease());
        assert!(v("3.0.dev4").is_prerelease());
        assert!(!v("2.1.0").is_prerelease());
        assert!(!v("10").is_prerelease());
    }

    #[test]
    fn latest_selection_scenario() {
        let mut versions: Vec<VersionString> = ["2.0.0", "2.1.0", "2.1.0rc1"]
            .iter()
            .map(|s| v(s))
            .collect();
        versions.sort();

        let latest_any = versions.last().unwrap();
        assert_eq!(latest_any.as_str(), "2.1.0rc1");

        let latest_stable = versions
            .iter()
            .filter(|ver| !ver.is_prerelease())
            .next_back()
            .unwrap();
        assert_eq!(latest_stable.as_str(), "2.1.0");
    }
}
