//! CLI argument definitions for `tidyload`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tidy_model::{CombineRule, RowsRange, SheetSelector};

#[derive(Parser)]
#[command(
    name = "tidyload",
    version,
    about = "Load tabular data from CSV, spreadsheets, Stata, SPSS and R files",
    long_about = "Load tabular data into a table and preview it.\n\n\
                  The file extension selects the reader. Multi-row headers are\n\
                  flattened into single column names, and variable and value\n\
                  labels are shown for statistical formats."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a table and print a preview.
    Load(LoadArgs),

    /// List the accepted file formats.
    Formats,
}

#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// File path or URL to load (omit when reading a remote spreadsheet).
    #[arg(value_name = "LOCATION")]
    pub location: Option<String>,

    /// Field separator for delimited text.
    #[arg(long = "sep", value_name = "SEP")]
    pub sep: Option<String>,

    /// Worksheet name, or zero-based position.
    #[arg(long = "sheet", value_name = "NAME|INDEX")]
    pub sheet: Option<SheetSelector>,

    /// Number of header rows to flatten.
    #[arg(long = "n-headers", value_name = "N")]
    pub n_headers: Option<usize>,

    /// How header levels shared by several columns are combined.
    #[arg(long = "combine", value_enum)]
    pub combine: Option<CombineArg>,

    /// Separator inside the parentheses of the default combine rule.
    #[arg(long = "paren-sep", value_name = "SEP")]
    pub paren_sep: Option<String>,

    /// Marker for a merged header cell.
    #[arg(long = "sentinel", value_name = "TEXT")]
    pub sentinel: Option<String>,

    /// Columns to read from an SPSS file.
    #[arg(long = "cols", value_name = "COLS", value_delimiter = ',')]
    pub cols: Option<Vec<String>>,

    /// 1-based inclusive row window for SPSS files.
    #[arg(long = "rows", value_name = "FIRST:LAST")]
    pub rows: Option<RowsRange>,

    /// Object to read from an RData archive.
    #[arg(long = "object", value_name = "NAME")]
    pub object: Option<String>,

    /// Remote spreadsheet URL.
    #[arg(long = "url", value_name = "URL")]
    pub url: Option<String>,

    /// Service-account credentials for the remote spreadsheet.
    #[arg(long = "credentials", value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// JSON file with load options; flags override its values.
    #[arg(long = "options", value_name = "FILE.json")]
    pub options: Option<PathBuf>,

    /// Number of rows to preview.
    #[arg(long = "head", value_name = "N", default_value_t = 10)]
    pub head: usize,

    /// Print variable and value labels.
    #[arg(long = "labels")]
    pub labels: bool,

    /// Suppress progress output.
    #[arg(long = "silently")]
    pub silently: bool,

    /// Use the bulk loading path.
    #[arg(long = "big-data")]
    pub big_data: bool,
}

/// Combine rule choices.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CombineArg {
    /// `level1 (level2, level3)`.
    Parens,
    /// `level1_level2_level3`.
    Underscore,
}

impl From<CombineArg> for CombineRule {
    fn from(arg: CombineArg) -> Self {
        match arg {
            CombineArg::Parens => CombineRule::Parenthesized,
            CombineArg::Underscore => CombineRule::Underscore,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
