//! CLI argument parsing for estado

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "estado")]
#[command(version)]
#[command(about = "Replay attribute-change events into a queryable state history", long_about = None)]
pub struct Cli {
    /// JSON Lines file of attribute-change events
    #[arg(value_name = "EVENTS")]
    pub events: PathBuf,

    /// Close the history at this time (default: last event timestamp)
    #[arg(long = "end", value_name = "T")]
    pub end: Option<u64>,

    /// Load state configuration from a TOML file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Abort on updates of attributes without an ongoing interval
    #[arg(long = "strict")]
    pub strict: bool,

    /// Attribute path for --at and --range (e.g. host/disk/000/status)
    #[arg(long = "path", value_name = "PATH")]
    pub path: Option<String>,

    /// Value of --path at time T
    #[arg(long = "at", value_name = "T", requires = "path")]
    pub at: Option<u64>,

    /// Intervals of --path intersecting [T0, T1]
    #[arg(
        long = "range",
        num_args = 2,
        value_names = ["T0", "T1"],
        requires = "path",
        conflicts_with = "at"
    )]
    pub range: Option<Vec<u64>>,

    /// Value of every attribute at time T
    #[arg(long = "full-state", value_name = "T", conflicts_with_all = ["at", "range"])]
    pub full_state: Option<u64>,

    /// Write the full history export as JSON to FILE
    #[arg(long = "dump", value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Range bounds as a pair, if --range was given
    pub fn range_bounds(&self) -> Option<(u64, u64)> {
        match self.range.as_deref() {
            Some([t0, t1]) => Some((*t0, *t1)),
            _ => None,
        }
    }
}
