//! Distribution records stored in the local index.

use crate::name::{DistName, ImportName};
use crate::version::VersionString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything the index knows about one distribution.
///
/// `versions` only grows through merges; `provided_names` grows too unless a
/// full re-fetch explicitly replaces it (see the index crate's merge modes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    /// Canonical distribution name.
    pub name: DistName,
    /// Known published versions, ordered ascending.
    pub versions: BTreeSet<VersionString>,
    /// Top-level import names this distribution provides.
    pub provided_names: BTreeSet<ImportName>,
    /// When this record was last refreshed from the repository.
    pub last_synced: DateTime<Utc>,
}

impl DistributionRecord {
    /// Create a new record stamped with the current time.
    #[must_use]
    pub fn new(name: DistName) -> Self {
        Self {
            name,
            versions: BTreeSet::new(),
            provided_names: BTreeSet::new(),
            last_synced: Utc::now(),
        }
    }

    /// Create a record with versions and provided names in one go.
    #[must_use]
    pub fn with_contents(
        name: DistName,
        versions: impl IntoIterator<Item = VersionString>,
        provided_names: impl IntoIterator<Item = ImportName>,
    ) -> Self {
        Self {
            name,
            versions: versions.into_iter().collect(),
            provided_names: provided_names.into_iter().collect(),
            last_synced: Utc::now(),
        }
    }

    /// The newest version respecting the prerelease policy.
    ///
    /// With `include_prereleases = false` and only prereleases published,
    /// falls back to the newest prerelease rather than reporting nothing.
    #[must_use]
    pub fn latest_version(&self, include_prereleases: bool) -> Option<&VersionString> {
        if include_prereleases {
            return self.versions.iter().next_back();
        }
        self.versions
            .iter()
            .filter(|v| !v.is_prerelease())
            .next_back()
            .or_else(|| self.versions.iter().next_back())
    }

    /// Union another record's contents into this one.
    pub fn union_from(&mut self, other: &Self) {
        self.versions.extend(other.versions.iter().cloned());
        self.provided_names
            .extend(other.provided_names.iter().cloned());
        if other.last_synced > self.last_synced {
            self.last_synced = other.last_synced;
        }
    }

    /// Whether this record claims to provide the given import name.
    #[must_use]
    pub fn provides(&self, name: &ImportName) -> bool {
        self.provided_names.contains(name)
    }
}
