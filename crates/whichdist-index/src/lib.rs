//! The durable index mapping import names to candidate distributions.
//!
//! Two indices over one authoritative store: `distributions` maps a
//! distribution name to its full record, `by_import` answers "who provides
//! import X" in O(1). Both are repaired together under one write lock on
//! every merge, so a reader can never observe an import entry pointing at a
//! missing record, or a record reachable under an import it does not list.
//!
//! Durability is a single JSON file written via temp-file-and-rename: the
//! file on disk is always either the old or the new complete index.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use ahash::HashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};
use whichdist_core::{DistName, DistributionRecord, Error, ImportName, Result};

/// How [`IndexStore::merge`] treats an existing record's provided names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Union versions and provided names with the existing record. Repeated
    /// syncs are idempotent and monotonic.
    #[default]
    Union,
    /// A full re-fetch: the incoming record's provided names replace the
    /// stale set. Versions still only grow.
    Replace,
}

#[derive(Debug, Default)]
struct IndexInner {
    distributions: HashMap<DistName, DistributionRecord>,
    by_import: HashMap<ImportName, BTreeSet<DistName>>,
}

impl IndexInner {
    fn unlink_provided(&mut self, record: &DistributionRecord) {
        for import in &record.provided_names {
            if let Some(set) = self.by_import.get_mut(import) {
                set.remove(&record.name);
                if set.is_empty() {
                    self.by_import.remove(import);
                }
            }
        }
    }

    fn link_provided(&mut self, record: &DistributionRecord) {
        for import in &record.provided_names {
            self.by_import
                .entry(import.clone())
                .or_default()
                .insert(record.name.clone());
        }
    }

    fn apply(&mut self, incoming: DistributionRecord, mode: MergeMode) {
        match self.distributions.get_mut(&incoming.name) {
            Some(existing) => {
                let merged = {
                    let mut merged = existing.clone();
                    if mode == MergeMode::Replace {
                        merged.provided_names.clear();
                    }
                    merged.union_from(&incoming);
                    merged
                };
                let old = existing.clone();
                *existing = merged.clone();
                self.unlink_provided(&old);
                self.link_provided(&merged);
            }
            None => {
                self.link_provided(&incoming);
                self.distributions.insert(incoming.name.clone(), incoming);
            }
        }
    }
}

/// Outcome of loading the durable index file.
#[derive(Debug)]
pub struct LoadedIndex {
    /// The store, possibly empty.
    pub store: IndexStore,
    /// True when the durable copy existed but could not be read; the caller
    /// proceeds with an empty index and may surface the staleness.
    pub stale: bool,
}

/// Import-name to distribution index with single-writer discipline.
///
/// Readers (`lookup`, `record`) take a shared lock and clone out; all
/// mutation goes through `merge` under the exclusive lock. The synchronizer
/// funnels worker results through one coordinating path, so writes never
/// race each other.
#[derive(Debug, Default)]
pub struct IndexStore {
    inner: RwLock<IndexInner>,
}

impl IndexStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the durable index file.
    ///
    /// A missing file yields a fresh store; an unreadable or corrupt file
    /// yields a fresh store flagged `stale` (reported, not fatal, so a
    /// damaged index never blocks a run).
    pub fn load(path: &Path) -> Result<LoadedIndex> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no index file, starting empty");
                return Ok(LoadedIndex {
                    store: Self::new(),
                    stale: false,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(Error::index(path, e.to_string()));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "index unreadable, starting empty");
                return Ok(LoadedIndex {
                    store: Self::new(),
                    stale: true,
                });
            }
        };

        let records: Vec<DistributionRecord> = match sonic_rs::from_slice(&data) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "index corrupt, starting empty");
                return Ok(LoadedIndex {
                    store: Self::new(),
                    stale: true,
                });
            }
        };

        let store = Self::new();
        store.merge(records, MergeMode::Union);
        debug!(path = %path.display(), distributions = store.len(), "loaded index");
        Ok(LoadedIndex {
            store,
            stale: false,
        })
    }

    /// All distributions known to provide the given import name.
    ///
    /// Read-only, never touches the network; an unknown name is an empty
    /// result, not an error.
    #[must_use]
    pub fn lookup(&self, name: &ImportName) -> Vec<DistributionRecord> {
        let inner = self.inner.read();
        match inner.by_import.get(name) {
            Some(dists) => dists
                .iter()
                .filter_map(|d| inner.distributions.get(d).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// The record for a distribution name, if known.
    #[must_use]
    pub fn record(&self, name: &DistName) -> Option<DistributionRecord> {
        self.inner.read().distributions.get(name).cloned()
    }

    /// Number of known distributions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().distributions.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().distributions.is_empty()
    }

    /// All known distribution names, sorted.
    #[must_use]
    pub fn distribution_names(&self) -> Vec<DistName> {
        let mut names: Vec<DistName> = self.inner.read().distributions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Upsert a batch of records, maintaining both indices atomically.
    ///
    /// Union merges are commutative and idempotent, so batches may arrive in
    /// any completion order and repeated syncs converge to the same state.
    pub fn merge(&self, batch: Vec<DistributionRecord>, mode: MergeMode) {
        if batch.is_empty() {
            return;
        }
        let mut inner = self.inner.write();
        for record in batch {
            inner.apply(record, mode);
        }
    }

    /// Write the durable copy: serialize to `<file>.tmp`, fsync, rename over
    /// the original. A crash mid-write leaves the previous copy intact.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let records = {
            let inner = self.inner.read();
            let mut records: Vec<DistributionRecord> =
                inner.distributions.values().cloned().collect();
            records.sort_by(|a, b| a.name.cmp(&b.name));
            records
        };

        let data =
            sonic_rs::to_string(&records).map_err(|e| Error::index(path, e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::index(parent, e.to_string()))?;
            }
        }

        let tmp = tmp_path(path);
        {
            let mut file =
                fs::File::create(&tmp).map_err(|e| Error::index(&tmp, e.to_string()))?;
            file.write_all(data.as_bytes())
                .map_err(|e| Error::index(&tmp, e.to_string()))?;
            file.sync_all().map_err(|e| Error::index(&tmp, e.to_string()))?;
        }
        fs::rename(&tmp, path).map_err(|e| Error::index(path, e.to_string()))?;

        debug!(path = %path.display(), distributions = records.len(), "persisted index");
        Ok(())
    }
}

/// Sidecar path for the in-progress copy: `index.json` becomes
/// `index.json.tmp` (suffix appended, not an extension swap).
fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    std::path::PathBuf::from(name)
}
