//! whichdist - resolve Python import names to PyPI distributions.
//!
//! Keeps a locally synced index of which distribution provides which
//! top-level import name, then answers `search` and `check` queries from it
//! without touching the network (except for targeted lookups on misses).

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod inspector;
mod output;

use clap::Parser;
use commands::{Cli, Commands};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!cli.no_ansi)
        .with_target(false)
        .without_time()
        .init();

    if cli.no_ansi {
        owo_colors::set_override(false);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            output::error(&format!("failed to create runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Sync(args) => commands::sync::run(args).await,
        Commands::Search(args) => commands::search::run(args).await,
        Commands::Check(args) => commands::check::run(args).await,
    }
}
