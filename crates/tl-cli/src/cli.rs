//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tableload - load delimited files into DuckDB tables and dump them back
#[derive(Parser, Debug)]
#[command(name = "tableload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: tableload.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a table from a delimited file and load its rows
    Load(LoadArgs),

    /// Print the rows of a table or query
    Dump(DumpArgs),
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Delimited input file with a header line
    pub input: PathBuf,

    /// Table to create (replaced if it exists)
    pub table: String,

    /// Field separator (overrides config)
    #[arg(short, long)]
    pub sep: Option<char>,

    /// Database path (overrides config)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Rows per insert transaction (overrides config)
    #[arg(short, long)]
    pub batch_size: Option<usize>,
}

/// Arguments for the dump command
///
/// Column names are taken from the first row, so an empty result prints
/// nothing at all, not even the TSV header line.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Table (or any FROM clause) to read
    pub table: String,

    /// Select terms, comma-separated (default: *)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "tsv")]
    pub format: DumpFormat,

    /// Database path (overrides config)
    #[arg(short, long)]
    pub database: Option<String>,
}

/// Dump output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    /// Tab-separated with a header line
    Tsv,
    /// One JSON object per row
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
