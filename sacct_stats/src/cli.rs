use std::path::PathBuf;

use clap::Parser;
use sacct_data::{Layout, Schema};
use tracing::Level;

/// Reads `sacct --parsable2` job accounting lines and writes one CSV row of statistics per job.
///
/// Lines that can't be parsed are reported on stderr and left out of the table.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(version)]
pub struct Args {
    /// sacct output to read; stdin if missing or `-`
    pub input: Option<PathBuf>,

    /// CSV file to write; stdout if missing or `-`
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Don't write the header row
    #[arg(short = 'n', long)]
    pub no_header: bool,

    /// TOML config file (default: `config/default.toml` if it exists)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input column preset: `without-end` or `with-end`
    #[arg(long, conflicts_with = "columns")]
    pub layout: Option<Layout>,

    /// Input columns as passed to `sacct --format`, e.g. `JobID,JobName,...,NodeList`
    #[arg(long)]
    pub columns: Option<Schema>,

    /// Field delimiter of the input
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Cell text for values that can't be computed
    #[arg(long)]
    pub not_computable: Option<String>,

    /// Leave out jobs that ran for zero seconds
    #[arg(long)]
    pub skip_zero_elapsed: bool,

    #[arg(long)]
    pub log_level: Option<Level>,
}
