//! Concurrent index synchronization for whichdist.
//!
//! Turns a worklist of distribution names into index updates: bounded
//! workers call the repository's metadata API, a single coordinating path
//! merges their results into the [`whichdist_index::IndexStore`] and persists
//! it, and per-item failures are accumulated instead of raised. See
//! [`Synchronizer`] for the scheduling and retry model.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod fetcher;
pub mod sync;

pub use fetcher::{BoxFuture, FetchError, FetchResult, MetadataFetcher};
pub use sync::{SyncConfig, SyncOutcome, Synchronizer};
