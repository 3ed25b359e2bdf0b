//! Sync command - crawl the repository into the local index.

use super::CommonArgs;
use crate::output;
use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use whichdist_sync::{SyncConfig, Synchronizer};

/// Arguments for the sync command.
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Concurrent fetch workers
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Replace each record's provided names instead of unioning (full
    /// re-fetch semantics)
    #[arg(long)]
    pub replace: bool,

    /// Introspect the newest prerelease instead of the newest stable release
    #[arg(long)]
    pub include_prereleases: bool,
}

/// Run the sync command.
pub async fn run(args: SyncArgs) -> Result<ExitCode> {
    let db_path = args.common.db_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let index = args.common.load_index(&db_path)?;
    let client = args.common.client()?;

    let mut config = SyncConfig {
        replace_provided_names: args.replace,
        include_prereleases: args.include_prereleases,
        ..SyncConfig::default()
    };
    if let Some(n) = args.concurrency {
        config.concurrency = n.max(1);
    }

    info!(
        index_url = %args.common.index_url,
        db = %db_path.display(),
        concurrency = config.concurrency,
        "starting sync"
    );

    let synchronizer = Synchronizer::new(Arc::new(client), index, config);

    let cancel = CancellationToken::new();
    let cancel_on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::warning("interrupted, finishing in-flight work");
            cancel_on_ctrl_c.cancel();
        }
    });

    let outcome = synchronizer.sync_all(&db_path, &cancel).await?;

    println!(
        "{} {} updated, {} failed{}",
        "sync:".green().bold(),
        outcome.updated.len(),
        outcome.failed.len(),
        if outcome.unattempted.is_empty() {
            String::new()
        } else {
            format!(", {} not attempted (cancelled)", outcome.unattempted.len())
        }
    );

    if !outcome.failed.is_empty() {
        let preview: Vec<&str> = outcome
            .failed
            .iter()
            .take(10)
            .map(whichdist_core::DistName::as_str)
            .collect();
        output::warning(&format!(
            "failed distributions: {}{}",
            preview.join(", "),
            if outcome.failed.len() > preview.len() {
                format!(" and {} more", outcome.failed.len() - preview.len())
            } else {
                String::new()
            }
        ));
    }

    Ok(ExitCode::SUCCESS)
}
