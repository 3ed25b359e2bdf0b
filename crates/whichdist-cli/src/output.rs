//! Terminal output helpers.

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{ContentArrangement, Table};
use owo_colors::OwoColorize;

/// Print an error line to stderr.
pub fn error(message: &str) {
    eprintln!("{} {message}", "error:".red().bold());
}

/// Print a warning line to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {message}", "warning:".yellow().bold());
}

/// A result table with the house style applied.
pub fn table<H, I>(headers: I) -> Table
where
    H: Into<comfy_table::Cell>,
    I: IntoIterator<Item = H>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.into_iter().collect::<Vec<_>>());
    table
}
