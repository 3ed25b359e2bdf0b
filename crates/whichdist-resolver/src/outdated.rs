//! Comparing pinned requirements against the newest indexed versions.

use whichdist_core::{DistName, RequirementEntry, Specifier, VersionString};
use whichdist_index::IndexStore;

/// One requirement compared against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedRow {
    /// Distribution name as written in the requirements file.
    pub distribution: String,
    /// The pinned specifier.
    pub specifier: Specifier,
    /// The locally pinned version.
    pub local: String,
    /// The newest indexed version, when the distribution is known.
    pub latest: Option<VersionString>,
}

impl OutdatedRow {
    /// Whether a newer version than the pin is known.
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        self.latest
            .as_ref()
            .is_some_and(|latest| *latest > VersionString::new(&self.local))
    }
}

/// Compare requirement entries against the index, read-only.
///
/// Rows come back sorted case-insensitively by distribution name; an unknown
/// distribution yields a row with no `latest`.
#[must_use]
pub fn latest_versions(
    entries: &[RequirementEntry],
    index: &IndexStore,
    include_prereleases: bool,
) -> Vec<OutdatedRow> {
    let mut rows: Vec<OutdatedRow> = entries
        .iter()
        .map(|entry| {
            let latest = index
                .record(&DistName::new(&entry.distribution))
                .and_then(|rec| rec.latest_version(include_prereleases).cloned());
            OutdatedRow {
                distribution: entry.distribution.clone(),
                specifier: entry.specifier,
                local: entry.version.clone(),
                latest,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.distribution
            .to_lowercase()
            .cmp(&b.distribution.to_lowercase())
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use whichdist_core::{DistributionRecord, ImportName};
    use whichdist_index::MergeMode;

    fn entry(distribution: &str, specifier: Specifier, version: &str) -> RequirementEntry {
        RequirementEntry::new(distribution, specifier, version)
    }

    fn index_with(records: Vec<DistributionRecord>) -> IndexStore {
        let index = IndexStore::new();
        index.merge(records, MergeMode::Union);
        index
    }

    fn record(name: &str, versions: &[&str]) -> DistributionRecord {
        DistributionRecord::with_contents(
            DistName::new(name),
            versions.iter().map(|v| VersionString::new(*v)),
            std::iter::empty::<ImportName>(),
        )
    }

    #[test]
    fn reports_newest_known_version() {
        let index = index_with(vec![record("requests", &["2.30.0", "2.31.0"])]);
        let entries = vec![entry("requests", Specifier::Exact, "2.30.0")];

        let rows = latest_versions(&entries, &index, false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].latest.as_ref().unwrap().as_str(), "2.31.0");
        assert!(rows[0].is_outdated());
    }

    #[test]
    fn up_to_date_pin_is_not_outdated() {
        let index = index_with(vec![record("requests", &["2.31.0"])]);
        let entries = vec![entry("requests", Specifier::Exact, "2.31.0")];

        let rows = latest_versions(&entries, &index, false);
        assert!(!rows[0].is_outdated());
    }

    #[test]
    fn unknown_distribution_has_no_latest() {
        let index = index_with(Vec::new());
        let entries = vec![entry("nosuchdist", Specifier::AtLeast, "1.0")];

        let rows = latest_versions(&entries, &index, false);
        assert_eq!(rows[0].latest, None);
        assert!(!rows[0].is_outdated());
    }

    #[test]
    fn prerelease_policy_changes_the_answer() {
        let index = index_with(vec![record("django", &["5.0", "5.1rc1"])]);
        let entries = vec![entry("django", Specifier::Compatible, "5.0")];

        let stable = latest_versions(&entries, &index, false);
        assert_eq!(stable[0].latest.as_ref().unwrap().as_str(), "5.0");

        let any = latest_versions(&entries, &index, true);
        assert_eq!(any[0].latest.as_ref().unwrap().as_str(), "5.1rc1");
    }

    #[test]
    fn rows_sort_case_insensitively() {
        let index = index_with(Vec::new());
        let entries = vec![
            entry("Zope", Specifier::Exact, "5.9"),
            entry("django", Specifier::Exact, "5.0"),
            entry("Flask", Specifier::Exact, "3.0.0"),
        ];

        let rows = latest_versions(&entries, &index, false);
        let names: Vec<&str> = rows.iter().map(|r| r.distribution.as_str()).collect();
        assert_eq!(names, vec!["django", "Flask", "Zope"]);
    }
}
