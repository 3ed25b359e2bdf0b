//! The resolution engine and disambiguation policies.

use crate::score::best_match;
use ahash::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use whichdist_core::{DistName, DistributionRecord, ImportName, Result};
use whichdist_index::IndexStore;
use whichdist_sync::Synchronizer;

/// The answer for one import name.
///
/// Ambiguity and unknownness are states, not errors; only index
/// infrastructure failure surfaces as `Err` from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one distribution provides the import name.
    Resolved(DistributionRecord),
    /// Several distributions provide it; `chosen` is the disambiguation
    /// policy's selection (possibly empty, meaning "skip this name").
    ResolvedMultiple {
        /// All providing distributions, sorted by name.
        candidates: Vec<DistributionRecord>,
        /// The subset the policy selected.
        chosen: Vec<DistName>,
    },
    /// No known distribution provides the import name.
    Unknown,
}

impl Resolution {
    /// Whether no distribution was found.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The distribution names this resolution settles on.
    #[must_use]
    pub fn selected(&self) -> Vec<DistName> {
        match self {
            Self::Resolved(record) => vec![record.name.clone()],
            Self::ResolvedMultiple { chosen, .. } => chosen.clone(),
            Self::Unknown => Vec::new(),
        }
    }
}

/// Settles which of several candidate distributions an import name maps to.
///
/// Must be total: every call returns, with an empty selection meaning "skip".
/// The engine consults a policy at most once per distinct import name.
pub trait Disambiguate: Send {
    /// Choose a subset of `candidates` for `import_name`. `best` is the
    /// engine's best-scoring suggestion, when one exists.
    fn choose(
        &mut self,
        import_name: &ImportName,
        candidates: &[DistName],
        best: Option<&DistName>,
    ) -> Vec<DistName>;
}

/// Non-interactive policy: the best-scoring candidate, or everything when no
/// suggestion exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferBest;

impl Disambiguate for PreferBest {
    fn choose(
        &mut self,
        _import_name: &ImportName,
        candidates: &[DistName],
        best: Option<&DistName>,
    ) -> Vec<DistName> {
        best.map_or_else(|| candidates.to_vec(), |name| vec![name.clone()])
    }
}

/// Policy that keeps every candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChooseAll;

impl Disambiguate for ChooseAll {
    fn choose(
        &mut self,
        _import_name: &ImportName,
        candidates: &[DistName],
        _best: Option<&DistName>,
    ) -> Vec<DistName> {
        candidates.to_vec()
    }
}

/// Targeted on-demand sync for import names the index has never seen.
#[derive(Debug)]
pub struct LiveSearch {
    synchronizer: Synchronizer,
    index_path: PathBuf,
    cancel: CancellationToken,
}

impl LiveSearch {
    /// Create a live-search hook persisting to `index_path`.
    #[must_use]
    pub fn new(
        synchronizer: Synchronizer,
        index_path: PathBuf,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            synchronizer,
            index_path,
            cancel,
        }
    }
}

/// Maps import names to the distributions providing them.
pub struct ResolutionEngine {
    index: Arc<IndexStore>,
    disambiguator: Box<dyn Disambiguate>,
    live_search: Option<LiveSearch>,
    memo: HashMap<ImportName, Resolution>,
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("indexed_distributions", &self.index.len())
            .field("memoized", &self.memo.len())
            .field("live_search", &self.live_search.is_some())
            .finish()
    }
}

impl ResolutionEngine {
    /// Create an engine over an index and a disambiguation policy.
    #[must_use]
    pub fn new(index: Arc<IndexStore>, disambiguator: Box<dyn Disambiguate>) -> Self {
        Self {
            index,
            disambiguator,
            live_search: None,
            memo: HashMap::default(),
        }
    }

    /// Enable one targeted sync pass for import names the index misses.
    #[must_use]
    pub fn with_live_search(mut self, live_search: LiveSearch) -> Self {
        self.live_search = Some(live_search);
        self
    }

    /// Resolve one import name.
    ///
    /// Repeated calls for the same canonical name return the memoized
    /// resolution; the disambiguation policy is never consulted twice for
    /// one name.
    pub async fn resolve(&mut self, name: &ImportName) -> Result<Resolution> {
        if let Some(hit) = self.memo.get(name) {
            return Ok(hit.clone());
        }

        let mut candidates = self.index.lookup(name);
        if candidates.is_empty() {
            if let Some(live) = &self.live_search {
                debug!(import = %name, "index miss, trying a targeted sync");
                let worklist = vec![DistName::new(name.as_str())];
                live.synchronizer
                    .sync_names(worklist, &live.index_path, &live.cancel)
                    .await?;
                candidates = self.index.lookup(name);
            }
        }

        candidates.sort_by(|a, b| a.name.cmp(&b.name));

        let resolution = if candidates.is_empty() {
            debug!(import = %name, "no distribution provides this import");
            Resolution::Unknown
        } else if candidates.len() == 1 {
            Resolution::Resolved(candidates.remove(0))
        } else {
            let names: Vec<DistName> = candidates.iter().map(|r| r.name.clone()).collect();
            let best = best_match(name, &names);
            let chosen = self.disambiguator.choose(name, &names, best.as_ref());
            debug!(
                import = %name,
                candidates = names.len(),
                chosen = chosen.len(),
                "ambiguous import disambiguated"
            );
            Resolution::ResolvedMultiple { candidates, chosen }
        };

        self.memo.insert(name.clone(), resolution.clone());
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;
    use whichdist_index::MergeMode;
    use whichdist_sync::{
        BoxFuture, FetchError, FetchResult, MetadataFetcher, SyncConfig,
    };
    use whichdist_core::VersionString;

    fn record(name: &str, versions: &[&str], provides: &[&str]) -> DistributionRecord {
        DistributionRecord::with_contents(
            DistName::new(name),
            versions.iter().map(|v| VersionString::new(*v)),
            provides.iter().map(ImportName::new),
        )
    }

    fn seeded_index(records: Vec<DistributionRecord>) -> Arc<IndexStore> {
        let index = Arc::new(IndexStore::new());
        index.merge(records, MergeMode::Union);
        index
    }

    /// Policy wrapper that records every invocation.
    struct Recording<P> {
        inner: P,
        calls: Arc<Mutex<Vec<ImportName>>>,
    }

    impl<P: Disambiguate> Disambiguate for Recording<P> {
        fn choose(
            &mut self,
            import_name: &ImportName,
            candidates: &[DistName],
            best: Option<&DistName>,
        ) -> Vec<DistName> {
            self.calls.lock().push(import_name.clone());
            self.inner.choose(import_name, candidates, best)
        }
    }

    #[tokio::test]
    async fn single_candidate_resolves_directly() {
        let index = seeded_index(vec![record("pyyaml", &["6.0"], &["yaml"])]);
        let mut engine = ResolutionEngine::new(index, Box::new(PreferBest));

        let resolution = engine.resolve(&ImportName::new("yaml")).await.unwrap();
        match resolution {
            Resolution::Resolved(rec) => assert_eq!(rec.name, DistName::new("pyyaml")),
            other => panic!("expected Resolved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_import_is_a_state_not_an_error() {
        let index = seeded_index(vec![record("flask", &["3.0.0"], &["flask"])]);
        let mut engine = ResolutionEngine::new(index, Box::new(PreferBest));

        let resolution = engine.resolve(&ImportName::new("nosuchmod")).await.unwrap();
        assert!(resolution.is_unknown());
        assert!(resolution.selected().is_empty());
    }

    #[tokio::test]
    async fn ambiguity_consults_the_policy_exactly_once() {
        let index = seeded_index(vec![
            record("pyyaml", &["6.0"], &["yaml"]),
            record("ruamel-yaml", &["0.18.5"], &["yaml", "ruamel"]),
        ]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let policy = Recording {
            inner: PreferBest,
            calls: Arc::clone(&calls),
        };
        let mut engine = ResolutionEngine::new(index, Box::new(policy));

        let name = ImportName::new("yaml");
        let first = engine.resolve(&name).await.unwrap();
        let second = engine.resolve(&name).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.lock().len(), 1);
        match first {
            Resolution::ResolvedMultiple { candidates, chosen } => {
                assert_eq!(candidates.len(), 2);
                // Neither name's import form is exactly "yaml"... pyyaml is
                // closer by edit distance.
                assert_eq!(chosen, vec![DistName::new("pyyaml")]);
            }
            other => panic!("expected ResolvedMultiple, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choice_is_preserved_as_skip() {
        struct SkipAll;
        impl Disambiguate for SkipAll {
            fn choose(
                &mut self,
                _import_name: &ImportName,
                _candidates: &[DistName],
                _best: Option<&DistName>,
            ) -> Vec<DistName> {
                Vec::new()
            }
        }

        let index = seeded_index(vec![
            record("pyyaml", &["6.0"], &["yaml"]),
            record("ruamel-yaml", &["0.18.5"], &["yaml"]),
        ]);
        let mut engine = ResolutionEngine::new(index, Box::new(SkipAll));

        let resolution = engine.resolve(&ImportName::new("yaml")).await.unwrap();
        match resolution {
            Resolution::ResolvedMultiple { chosen, .. } => assert!(chosen.is_empty()),
            other => panic!("expected ResolvedMultiple, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn choose_all_keeps_every_candidate() {
        let index = seeded_index(vec![
            record("pyyaml", &["6.0"], &["yaml"]),
            record("ruamel-yaml", &["0.18.5"], &["yaml"]),
        ]);
        let mut engine = ResolutionEngine::new(index, Box::new(ChooseAll));

        let resolution = engine.resolve(&ImportName::new("yaml")).await.unwrap();
        assert_eq!(
            resolution.selected(),
            vec![DistName::new("pyyaml"), DistName::new("ruamel-yaml")]
        );
    }

    /// Fetcher serving a single known distribution, for live-search tests.
    struct OneDistFetcher;

    impl MetadataFetcher for OneDistFetcher {
        fn list_distributions(&self) -> BoxFuture<'_, FetchResult<Vec<DistName>>> {
            Box::pin(async { Ok(vec![DistName::new("requests")]) })
        }

        fn list_versions<'a>(
            &'a self,
            name: &'a DistName,
            _include_prereleases: bool,
        ) -> BoxFuture<'a, FetchResult<Vec<VersionString>>> {
            Box::pin(async move {
                if name.as_str() == "requests" {
                    Ok(vec![VersionString::new("2.31.0")])
                } else {
                    Err(FetchError::NotFound)
                }
            })
        }

        fn fetch_provided_names<'a>(
            &'a self,
            _name: &'a DistName,
            _version: &'a VersionString,
        ) -> BoxFuture<'a, FetchResult<BTreeSet<ImportName>>> {
            Box::pin(async {
                Ok([ImportName::new("requests")].into_iter().collect())
            })
        }
    }

    #[tokio::test]
    async fn index_miss_triggers_one_targeted_sync() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index.json");
        let index = Arc::new(IndexStore::new());
        let synchronizer = Synchronizer::new(
            Arc::new(OneDistFetcher),
            Arc::clone(&index),
            SyncConfig::default(),
        );
        let live = LiveSearch::new(
            synchronizer,
            index_path.clone(),
            CancellationToken::new(),
        );
        let mut engine =
            ResolutionEngine::new(Arc::clone(&index), Box::new(PreferBest)).with_live_search(live);

        let resolution = engine.resolve(&ImportName::new("requests")).await.unwrap();
        match resolution {
            Resolution::Resolved(rec) => {
                assert_eq!(rec.name, DistName::new("requests"));
                assert!(rec.versions.contains(&VersionString::new("2.31.0")));
            }
            other => panic!("expected Resolved, got {other:?}"),
        }
        // The targeted sync persisted what it learned.
        assert!(index_path.exists());

        // A genuinely unknown name still resolves to Unknown after its own
        // targeted attempt.
        let missing = engine.resolve(&ImportName::new("leftpad")).await.unwrap();
        assert!(missing.is_unknown());
    }
}
