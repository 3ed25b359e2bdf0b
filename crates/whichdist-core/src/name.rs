//! Canonicalized import and distribution names.
//!
//! Both name kinds are stored in canonical form so lookups and merges never
//! depend on the spelling the repository or the source tree used. Import
//! names fold `-` and `.` to `_` (the identifier alphabet); distribution
//! names follow the PEP 503 rule of folding runs of `[-_.]` to a single `-`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical top-level import name (e.g. `yaml` for `import yaml`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportName {
    canonical: String,
}

impl ImportName {
    /// Canonicalize an import name: ASCII lowercase, `-`/`.` fold to `_`.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        let canonical = name
            .as_ref()
            .trim()
            .chars()
            .map(|c| match c {
                '-' | '.' => '_',
                _ => c.to_ascii_lowercase(),
            })
            .collect();
        Self { canonical }
    }

    /// Get the canonical form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Whether the name is empty after canonicalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl fmt::Display for ImportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical)
    }
}

impl FromStr for ImportName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ImportName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Canonical distribution name per PEP 503.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistName {
    canonical: String,
}

impl DistName {
    /// Canonicalize a distribution name: lowercase, runs of `[-_.]` fold to `-`.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        let mut canonical = String::with_capacity(name.as_ref().len());
        let mut pending_sep = false;
        for c in name.as_ref().trim().chars() {
            match c {
                '-' | '_' | '.' => {
                    if !canonical.is_empty() {
                        pending_sep = true;
                    }
                }
                _ => {
                    if pending_sep {
                        canonical.push('-');
                        pending_sep = false;
                    }
                    canonical.push(c.to_ascii_lowercase());
                }
            }
        }
        Self { canonical }
    }

    /// Get the canonical form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Whether the name is empty after canonicalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// The canonical name spelled in the import-name alphabet (`-` to `_`).
    ///
    /// Used when comparing a distribution name against an import name.
    #[must_use]
    pub fn as_import_form(&self) -> String {
        self.canonical.replace('-', "_")
    }
}

impl fmt::Display for DistName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical)
    }
}

impl FromStr for DistName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for DistName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_name_canonicalization() {
        assert_eq!(ImportName::new("YAML").as_str(), "yaml");
        assert_eq!(ImportName::new("ruamel.yaml").as_str(), "ruamel_yaml");
        assert_eq!(ImportName::new("typing-extensions").as_str(), "typing_extensions");
        assert_eq!(ImportName::new("bs4"), ImportName::new("BS4"));
    }

    #[test]
    fn dist_name_canonicalization() {
        assert_eq!(DistName::new("Beautifulsoup4").as_str(), "beautifulsoup4");
        assert_eq!(DistName::new("ruamel.yaml").as_str(), "ruamel-yaml");
        assert_eq!(DistName::new("typing_extensions").as_str(), "typing-extensions");
        assert_eq!(DistName::new("zope.-_interface").as_str(), "zope-interface");
        assert_eq!(DistName::new("A.--B"), DistName::new("a-b"));
    }

    #[test]
    fn dist_name_import_form() {
        assert_eq!(DistName::new("ruamel.yaml").as_import_form(), "ruamel_yaml");
        assert_eq!(DistName::new("pyyaml").as_import_form(), "pyyaml");
    }
}
