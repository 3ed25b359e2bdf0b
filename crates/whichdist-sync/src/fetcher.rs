//! Metadata fetching trait and per-item failure taxonomy.
//!
//! The synchronizer depends on exactly these operations; the PyPI client in
//! `whichdist-pypi` is the production implementation, tests supply scripted
//! ones.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use whichdist_core::{DistName, ImportName, VersionString};

/// Boxed future alias used by the object-safe fetcher trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A failure fetching metadata for one distribution.
///
/// These never abort a sync run: `Transient` is retried within the item's
/// budget, the rest are terminal for that item and recorded as failed.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The distribution does not exist upstream. A normal outcome.
    #[error("distribution not found upstream")]
    NotFound,

    /// Network trouble, timeout, or a 5xx/429 response. Retryable.
    #[error("transient error: {message}")]
    Transient {
        /// Error message.
        message: String,
    },

    /// The repository returned something unparseable. Never retried.
    #[error("malformed metadata: {message}")]
    Malformed {
        /// Error message.
        message: String,
    },
}

impl FetchError {
    /// Create a transient error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a malformed-metadata error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Whether the synchronizer should retry this failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Result type for per-item fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Repository metadata access the synchronizer depends on.
///
/// Each call is independently retryable and must not execute code from any
/// downloaded artifact.
pub trait MetadataFetcher: Send + Sync {
    /// All distribution names the repository knows. Drives a full crawl.
    fn list_distributions(&self) -> BoxFuture<'_, FetchResult<Vec<DistName>>>;

    /// Available versions for a distribution, ordered ascending. An empty
    /// sequence means the name exists but has no releases (or the name is
    /// unknown upstream) and is a normal outcome, not a failure.
    fn list_versions<'a>(
        &'a self,
        name: &'a DistName,
        include_prereleases: bool,
    ) -> BoxFuture<'a, FetchResult<Vec<VersionString>>>;

    /// The top-level import names a specific version provides, learned by
    /// static introspection of the published artifact.
    fn fetch_provided_names<'a>(
        &'a self,
        name: &'a DistName,
        version: &'a VersionString,
    ) -> BoxFuture<'a, FetchResult<BTreeSet<ImportName>>>;
}

impl<T: MetadataFetcher + ?Sized> MetadataFetcher for Arc<T> {
    fn list_distributions(&self) -> BoxFuture<'_, FetchResult<Vec<DistName>>> {
        (**self).list_distributions()
    }

    fn list_versions<'a>(
        &'a self,
        name: &'a DistName,
        include_prereleases: bool,
    ) -> BoxFuture<'a, FetchResult<Vec<VersionString>>> {
        (**self).list_versions(name, include_prereleases)
    }

    fn fetch_provided_names<'a>(
        &'a self,
        name: &'a DistName,
        version: &'a VersionString,
    ) -> BoxFuture<'a, FetchResult<BTreeSet<ImportName>>> {
        (**self).fetch_provided_names(name, version)
    }
}
