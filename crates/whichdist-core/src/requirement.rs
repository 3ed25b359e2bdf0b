//! Requirement entries and the requirements-file shape.
//!
//! Entries are consumed from and rendered to the familiar one-line form
//! `name<specifier>version`, optionally annotated with the source locations
//! that referenced the import. The full requirements writer (diffing,
//! terminal output) lives outside the core; this module owns the data and
//! its textual shape.

use crate::error::{Error, Result};
use crate::name::ImportName;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Comparison specifier binding a distribution to a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specifier {
    /// `==` exact pin.
    Exact,
    /// `~=` compatible release.
    Compatible,
    /// `>=` minimum version.
    AtLeast,
    /// `>` strictly newer.
    GreaterThan,
}

impl Specifier {
    /// The operator text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "==",
            Self::Compatible => "~=",
            Self::AtLeast => ">=",
            Self::GreaterThan => ">",
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Specifier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "==" => Ok(Self::Exact),
            "~=" => Ok(Self::Compatible),
            ">=" => Ok(Self::AtLeast),
            ">" => Ok(Self::GreaterThan),
            other => Err(format!("unknown specifier '{other}'")),
        }
    }
}

/// One requirement line plus the source locations that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementEntry {
    /// Distribution name as written (not canonicalized; the file keeps the
    /// repository's preferred spelling).
    pub distribution: String,
    /// Comparison specifier.
    pub specifier: Specifier,
    /// Pinned version.
    pub version: String,
    /// Referencing locations: file path to sorted line numbers.
    pub locations: BTreeMap<String, BTreeSet<u32>>,
}

impl RequirementEntry {
    /// Create a new entry without locations.
    #[must_use]
    pub fn new(
        distribution: impl Into<String>,
        specifier: Specifier,
        version: impl Into<String>,
    ) -> Self {
        Self {
            distribution: distribution.into(),
            specifier,
            version: version.into(),
            locations: BTreeMap::new(),
        }
    }

    /// Record a referencing location.
    pub fn add_location(&mut self, file: impl Into<String>, line: u32) {
        self.locations.entry(file.into()).or_default().insert(line);
    }

    /// Parse a single requirement line. Returns `None` for blank lines and
    /// comments.
    pub fn parse_line(line: &str, lineno: u32) -> Result<Option<Self>> {
        let text = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        // Two-character operators first so ">=" is not split as ">" + "=".
        for op in ["~=", "==", ">=", ">"] {
            if let Some(idx) = text.find(op) {
                let name = text[..idx].trim();
                let version = text[idx + op.len()..].trim();
                if name.is_empty() || version.is_empty() {
                    return Err(Error::Requirement {
                        line: lineno,
                        message: format!("missing name or version in '{text}'"),
                    });
                }
                let specifier = op.parse().map_err(|message| Error::Requirement {
                    line: lineno,
                    message,
                })?;
                return Ok(Some(Self::new(name, specifier, version)));
            }
        }

        Err(Error::Requirement {
            line: lineno,
            message: format!("no comparison specifier in '{text}'"),
        })
    }

    /// Parse a requirements file. Malformed lines are reported and skipped.
    pub fn parse_file(path: &Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut entries = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let lineno = idx as u32 + 1;
            match Self::parse_line(line, lineno) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(file = %path.display(), %err, "skipping requirement line");
                }
            }
        }
        Ok(entries)
    }

    /// Format as requirements-file text, optionally preceded by location
    /// comments when several files referenced the same name.
    #[must_use]
    pub fn format(&self, with_locations: bool) -> String {
        let mut out = String::new();
        if with_locations && !self.locations.is_empty() {
            for (file, lines) in &self.locations {
                let lines = lines
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                out.push_str(&format!("# {file}: {lines}\n"));
            }
        }
        out.push_str(&format!(
            "{}{}{}\n",
            self.distribution, self.specifier, self.version
        ));
        out
    }
}

/// Options for [`render_requirements`].
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Leading banner comment (written verbatim, `#`-prefixed per line).
    pub banner: Option<String>,
    /// Emit `# file: lines` comments above each entry.
    pub with_locations: bool,
    /// Append the unresolved-imports comment section.
    pub with_unresolved: bool,
}

/// Render a full requirements file: banner, entries sorted case-insensitively
/// by distribution name, then an optional section naming import names that
/// could not be resolved.
#[must_use]
pub fn render_requirements(
    entries: &[RequirementEntry],
    unresolved: &[ImportName],
    options: &RenderOptions,
) -> String {
    let mut out = String::new();

    if let Some(banner) = &options.banner {
        for line in banner.lines() {
            out.push_str(&format!("# {line}\n"));
        }
        out.push('\n');
    }

    let mut sorted: Vec<&RequirementEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.distribution.to_lowercase());
    for entry in sorted {
        out.push_str(&entry.format(options.with_locations));
    }

    if options.with_unresolved && !unresolved.is_empty() {
        out.push_str("\n# WARNING: no distribution found for the following import names.\n");
        let mut names: Vec<&ImportName> = unresolved.iter().collect();
        names.sort();
        for name in names {
            out.push_str(&format!("# {name}\n"));
        }
    }

    out
}
