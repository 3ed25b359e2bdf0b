//! Search command - which distribution provides an import name?

use super::CommonArgs;
use crate::output;
use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use whichdist_core::ImportName;
use whichdist_resolver::{LiveSearch, PreferBest, Resolution, ResolutionEngine};
use whichdist_sync::{SyncConfig, Synchronizer};

/// Arguments for the search command.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Import names to resolve
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Consider prerelease versions when reporting the latest
    #[arg(long)]
    pub include_prereleases: bool,

    /// Answer from the local index only; no targeted lookups on misses
    #[arg(long)]
    pub offline: bool,
}

/// Run the search command.
pub async fn run(args: SearchArgs) -> Result<ExitCode> {
    let db_path = args.common.db_path()?;
    let index = args.common.load_index(&db_path)?;

    let mut engine = ResolutionEngine::new(Arc::clone(&index), Box::new(PreferBest));
    if !args.offline {
        let client = args.common.client()?;
        let config = SyncConfig {
            include_prereleases: args.include_prereleases,
            ..SyncConfig::default()
        };
        let synchronizer = Synchronizer::new(Arc::new(client), Arc::clone(&index), config);
        engine = engine.with_live_search(LiveSearch::new(
            synchronizer,
            db_path.clone(),
            CancellationToken::new(),
        ));
    }

    let mut table = output::table(["Import name", "Distribution", "Latest version"]);
    let mut not_found = Vec::new();

    for raw in &args.names {
        let import = ImportName::new(raw);
        let resolution = engine.resolve(&import).await?;
        if resolution.is_unknown() {
            not_found.push(raw.clone());
            continue;
        }
        let chosen = resolution.selected();
        if chosen.is_empty() {
            not_found.push(raw.clone());
            continue;
        }
        if let Resolution::ResolvedMultiple { candidates, .. } = &resolution {
            tracing::debug!(
                import = %import,
                candidates = candidates.len(),
                "ambiguous import name"
            );
        }
        for dist in chosen {
            let latest = index
                .record(&dist)
                .and_then(|rec| {
                    rec.latest_version(args.include_prereleases)
                        .map(|v| v.as_str().to_string())
                })
                .unwrap_or_default();
            table.add_row(vec![import.as_str().to_string(), dist.to_string(), latest]);
        }
    }

    if table.row_iter().next().is_some() {
        println!("{table}");
    }

    if !not_found.is_empty() {
        println!(
            "{} no distribution found for: {}",
            "not found:".yellow().bold(),
            not_found.join(", ")
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
