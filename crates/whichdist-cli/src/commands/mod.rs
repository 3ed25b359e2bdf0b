//! CLI commands for whichdist.

pub mod check;
pub mod search;
pub mod sync;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use whichdist_index::{IndexStore, LoadedIndex};
use whichdist_pypi::{SimpleIndexClient, SimpleIndexConfig};

/// whichdist - resolve Python import names to PyPI distributions
#[derive(Parser, Debug)]
#[command(name = "whichdist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    pub no_ansi: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync the local distribution index from the package repository
    Sync(sync::SyncArgs),

    /// Look up which distributions provide the given import names
    Search(search::SearchArgs),

    /// Compare requirement files against the newest indexed versions
    Check(check::CheckArgs),
}

/// Options shared by every subcommand that touches the index.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Simple repository base URL
    #[arg(long, value_name = "URL", default_value = whichdist_pypi::DEFAULT_INDEX_URL)]
    pub index_url: String,

    /// Index database file (defaults to the platform data directory)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

impl CommonArgs {
    /// The index database path, defaulting under the platform data dir.
    pub fn db_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.db {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", "whichdist")
            .context("could not determine a data directory; pass --db")?;
        Ok(dirs.data_dir().join("index.json"))
    }

    /// Load the index database, warning when a corrupt file was set aside.
    pub fn load_index(&self, path: &std::path::Path) -> anyhow::Result<Arc<IndexStore>> {
        let LoadedIndex { store, stale } = IndexStore::load(path)?;
        if stale {
            crate::output::warning(&format!(
                "index at {} was unreadable and will be rebuilt",
                path.display()
            ));
        }
        Ok(Arc::new(store))
    }

    /// Build the repository client with the wheel inspector attached.
    pub fn client(&self) -> anyhow::Result<SimpleIndexClient> {
        let config = SimpleIndexConfig::with_base_url(&self.index_url)?;
        let client = SimpleIndexClient::new(config, Arc::new(crate::inspector::WheelInspector))?;
        Ok(client)
    }
}
