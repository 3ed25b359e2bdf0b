//! The synchronizer: worklist scheduling, retries, single-writer merging.
//!
//! Retry/backoff is an explicit per-item state machine (`attempts_remaining`,
//! `next_eligible`) driven by the dispatcher rather than nested catch loops.
//! Workers only fetch; every merge goes through the dispatcher, which applies
//! batches in completion order. Union merges are commutative, so the final
//! index state does not depend on worker timing.

use crate::fetcher::{FetchError, MetadataFetcher};
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use whichdist_core::{DistName, DistributionRecord, Error, Result, VersionString};
use whichdist_index::{IndexStore, MergeMode};

/// Tuning knobs for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum concurrent fetch workers.
    pub concurrency: usize,
    /// Retries granted per item after its first attempt.
    pub retry_budget: u32,
    /// First backoff delay; doubles per retry.
    pub backoff_base: Duration,
    /// Backoff ceiling.
    pub backoff_cap: Duration,
    /// Introspect the newest prerelease instead of the newest stable release.
    pub include_prereleases: bool,
    /// Completed records buffered before a merge is applied.
    pub merge_batch: usize,
    /// Full re-fetch: replace each record's provided names instead of
    /// unioning them.
    pub replace_provided_names: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry_budget: 3,
            backoff_base: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(10),
            include_prereleases: false,
            merge_batch: 32,
            replace_provided_names: false,
        }
    }
}

/// Default worker count for network-bound crawling.
#[must_use]
pub fn default_concurrency() -> usize {
    let cores = std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get);
    2 * cores + 1
}

/// What one sync run accomplished.
///
/// Partial failure is data, not an error: the caller decides how to report
/// `failed` (upstream-unknown names land there too).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Distributions merged into the index.
    pub updated: BTreeSet<DistName>,
    /// Distributions that failed terminally (not found, malformed, or retry
    /// budget exhausted).
    pub failed: BTreeSet<DistName>,
    /// Worklist names never attempted because the run was cancelled (items
    /// mid-retry at cancellation land here as well).
    pub unattempted: BTreeSet<DistName>,
}

/// Per-item retry state.
#[derive(Debug)]
struct WorkItem {
    name: DistName,
    attempts_remaining: u32,
    next_eligible: Option<Instant>,
}

impl WorkItem {
    fn new(name: DistName, retry_budget: u32) -> Self {
        Self {
            name,
            attempts_remaining: retry_budget,
            next_eligible: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.next_eligible.map_or(true, |at| at <= now)
    }
}

#[derive(Debug)]
enum TaskOutcome {
    Updated(DistributionRecord),
    Missing,
    Failed(FetchError),
}

/// Crawls distribution metadata into the index under bounded concurrency.
pub struct Synchronizer {
    fetcher: Arc<dyn MetadataFetcher>,
    index: Arc<IndexStore>,
    config: SyncConfig,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("config", &self.config)
            .field("indexed_distributions", &self.index.len())
            .finish()
    }
}

impl Synchronizer {
    /// Create a synchronizer over a fetcher and a shared index.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        index: Arc<IndexStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            fetcher,
            index,
            config,
        }
    }

    /// The shared index this synchronizer writes into.
    #[must_use]
    pub fn index(&self) -> &Arc<IndexStore> {
        &self.index
    }

    /// Full crawl: sync every distribution the repository knows about.
    pub async fn sync_all(
        &self,
        index_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let names = self
            .fetcher
            .list_distributions()
            .await
            .map_err(|e| Error::Config(format!("failed to list repository contents: {e}")))?;
        info!(distributions = names.len(), "starting full index sync");
        self.sync_names(names, index_path, cancel).await
    }

    /// Targeted crawl over a caller-supplied worklist.
    ///
    /// Drives the worklist to completion (or cancellation), merges completed
    /// batches through this single coordinating path, and always persists
    /// whatever was merged; partial progress is never discarded. Only an
    /// unwritable index aborts the run.
    pub async fn sync_names(
        &self,
        names: Vec<DistName>,
        index_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let mut seen = BTreeSet::new();
        let mut pending: VecDeque<WorkItem> = names
            .into_iter()
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .map(|n| WorkItem::new(n, self.config.retry_budget))
            .collect();

        let mode = if self.config.replace_provided_names {
            MergeMode::Replace
        } else {
            MergeMode::Union
        };

        let mut tasks: JoinSet<(WorkItem, TaskOutcome)> = JoinSet::new();
        let mut outcome = SyncOutcome::default();
        let mut batch: Vec<DistributionRecord> = Vec::new();

        loop {
            if !cancel.is_cancelled() {
                while tasks.len() < self.config.concurrency.max(1) {
                    let Some(item) = take_ready(&mut pending) else {
                        break;
                    };
                    let fetcher = Arc::clone(&self.fetcher);
                    let include_prereleases = self.config.include_prereleases;
                    tasks.spawn(async move {
                        let result = fetch_one(&*fetcher, &item.name, include_prereleases).await;
                        (item, result)
                    });
                }
            }

            if tasks.is_empty() {
                if cancel.is_cancelled() || pending.is_empty() {
                    break;
                }
                // Everything pending is backing off; sleep until the first
                // item becomes eligible, or until cancellation.
                let wake = next_wakeup(&pending);
                tokio::select! {
                    () = tokio::time::sleep_until(wake) => {}
                    () = cancel.cancelled() => {}
                }
                continue;
            }

            let Some(joined) = tasks.join_next().await else {
                continue;
            };
            let (item, task_outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "sync worker panicked");
                    continue;
                }
            };

            match task_outcome {
                TaskOutcome::Updated(record) => {
                    outcome.updated.insert(record.name.clone());
                    batch.push(record);
                    if batch.len() >= self.config.merge_batch.max(1) {
                        self.index.merge(std::mem::take(&mut batch), mode);
                    }
                }
                TaskOutcome::Missing => {
                    debug!(name = %item.name, "not found upstream");
                    outcome.failed.insert(item.name);
                }
                TaskOutcome::Failed(err) if err.is_retryable() && item.attempts_remaining > 0 => {
                    let used = self.config.retry_budget - item.attempts_remaining;
                    let delay = backoff_delay(&self.config, used);
                    debug!(
                        name = %item.name,
                        remaining = item.attempts_remaining,
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "transient failure, requeueing"
                    );
                    pending.push_back(WorkItem {
                        name: item.name,
                        attempts_remaining: item.attempts_remaining - 1,
                        next_eligible: Some(Instant::now() + delay),
                    });
                }
                TaskOutcome::Failed(err) => {
                    warn!(name = %item.name, %err, "giving up on distribution");
                    outcome.failed.insert(item.name);
                }
            }
        }

        outcome.unattempted = pending.into_iter().map(|item| item.name).collect();

        self.index.merge(batch, mode);
        self.index.persist(index_path)?;

        info!(
            updated = outcome.updated.len(),
            failed = outcome.failed.len(),
            unattempted = outcome.unattempted.len(),
            "sync run finished"
        );
        Ok(outcome)
    }
}

/// Fetch metadata for one distribution. No retry logic here: the dispatcher
/// owns the state machine.
async fn fetch_one(
    fetcher: &dyn MetadataFetcher,
    name: &DistName,
    include_prereleases: bool,
) -> TaskOutcome {
    let versions = match fetcher.list_versions(name, true).await {
        Ok(versions) => versions,
        Err(FetchError::NotFound) => return TaskOutcome::Missing,
        Err(err) => return TaskOutcome::Failed(err),
    };
    let Some(pick) = select_version(&versions, include_prereleases) else {
        return TaskOutcome::Missing;
    };

    match fetcher.fetch_provided_names(name, &pick).await {
        Ok(provided) => TaskOutcome::Updated(DistributionRecord::with_contents(
            name.clone(),
            versions,
            provided,
        )),
        Err(err) => TaskOutcome::Failed(err),
    }
}

/// The version to introspect: newest stable, or newest of any kind when
/// prereleases are allowed (falling back to prereleases when nothing stable
/// exists).
fn select_version(versions: &[VersionString], include_prereleases: bool) -> Option<VersionString> {
    if include_prereleases {
        return versions.iter().max().cloned();
    }
    versions
        .iter()
        .filter(|v| !v.is_prerelease())
        .max()
        .or_else(|| versions.iter().max())
        .cloned()
}

fn backoff_delay(config: &SyncConfig, attempts_used: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempts_used.min(16));
    config.backoff_base.saturating_mul(factor).min(config.backoff_cap)
}

fn take_ready(pending: &mut VecDeque<WorkItem>) -> Option<WorkItem> {
    let now = Instant::now();
    let idx = pending.iter().position(|item| item.ready(now))?;
    pending.remove(idx)
}

fn next_wakeup(pending: &VecDeque<WorkItem>) -> Instant {
    pending
        .iter()
        .filter_map(|item| item.next_eligible)
        .min()
        .unwrap_or_else(Instant::now)
}
