//! PEP 503/691 "simple" repository client for whichdist.
//!
//! [`SimpleIndexClient`] implements the synchronizer's
//! [`whichdist_sync::MetadataFetcher`] against a simple-index base URL,
//! negotiating the JSON project listing with an HTML fallback. Artifact
//! introspection (unpacking wheels/sdists for their top-level names) is not
//! done here: the client downloads the payload and hands it to an injected
//! [`ArtifactInspector`].

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod parse;

pub use client::{
    ArtifactInspector, InspectError, SimpleIndexClient, SimpleIndexConfig, DEFAULT_INDEX_URL,
};
pub use parse::{
    parse_file_listing_html, parse_file_listing_json, parse_project_list_html,
    parse_project_list_json, version_from_filename, ArtifactLink,
};
