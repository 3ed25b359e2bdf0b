//! Check command - compare requirement files against the indexed versions.

use super::CommonArgs;
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use whichdist_core::RequirementEntry;
use whichdist_resolver::latest_versions;

/// Arguments for the check command.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Requirement files to check
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Consider prerelease versions when reporting the latest
    #[arg(long)]
    pub include_prereleases: bool,

    /// Exit with a failure status when any requirement is outdated
    #[arg(long)]
    pub strict: bool,
}

/// Run the check command.
pub async fn run(args: CheckArgs) -> Result<ExitCode> {
    let db_path = args.common.db_path()?;
    let index = args.common.load_index(&db_path)?;
    if index.is_empty() {
        output::warning("the local index is empty; run 'whichdist sync' first");
    }

    let mut entries: Vec<RequirementEntry> = Vec::new();
    for file in &args.files {
        let parsed = RequirementEntry::parse_file(file)
            .with_context(|| format!("reading {}", file.display()))?;
        entries.extend(parsed);
    }

    let rows = latest_versions(&entries, &index, args.include_prereleases);
    let mut outdated = 0usize;

    let mut table = output::table(["Distribution", "Spec", "Local", "Latest"]);
    for row in &rows {
        let latest = row
            .latest
            .as_ref()
            .map_or_else(String::new, |v| v.as_str().to_string());
        let latest_cell = if row.is_outdated() {
            outdated += 1;
            format!("{}", latest.yellow())
        } else {
            latest
        };
        table.add_row(vec![
            row.distribution.clone(),
            row.specifier.as_str().to_string(),
            row.local.clone(),
            latest_cell,
        ]);
    }
    println!("{table}");

    let unknown: Vec<&str> = rows
        .iter()
        .filter(|r| r.latest.is_none())
        .map(|r| r.distribution.as_str())
        .collect();
    if !unknown.is_empty() {
        output::warning(&format!("not in the index: {}", unknown.join(", ")));
    }

    if outdated > 0 {
        println!(
            "{} {outdated} of {} requirements outdated",
            "check:".yellow().bold(),
            rows.len()
        );
        if args.strict {
            return Ok(ExitCode::FAILURE);
        }
    } else {
        println!(
            "{} all {} requirements up to date",
            "check:".green().bold(),
            rows.len()
        );
    }

    Ok(ExitCode::SUCCESS)
}
