//! Core types and utilities for whichdist.
//!
//! This crate holds the value types shared by the rest of the workspace:
//! canonicalized import and distribution names, the version ordering used to
//! pick "latest" releases, the [`DistributionRecord`] stored in the local
//! index, and the requirement-entry parsing/rendering that shapes
//! requirements files.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod name;
pub mod record;
pub mod requirement;
pub mod version;

pub use error::{Error, Result};
pub use name::{DistName, ImportName};
pub use record::DistributionRecord;
pub use requirement::{
    render_requirements, RenderOptions, RequirementEntry, Specifier,
};
pub use version::VersionString;
