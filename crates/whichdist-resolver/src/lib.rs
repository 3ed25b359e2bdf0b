//! Resolution of top-level import names to distributions.
//!
//! [`ResolutionEngine`] answers "which distribution do I install to get
//! `import foo`?" from the local index, optionally falling back to one
//! targeted sync for names the index has never seen. Ambiguity (several
//! distributions providing the same import name) is a represented state,
//! settled by a [`Disambiguate`] policy that is consulted at most once per
//! import name.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod outdated;
pub mod score;

pub use engine::{
    ChooseAll, Disambiguate, LiveSearch, PreferBest, Resolution, ResolutionEngine,
};
pub use outdated::{latest_versions, OutdatedRow};
pub use score::{best_match, similarity};
