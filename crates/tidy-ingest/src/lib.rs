//! Tabular data loading.
//!
//! This crate reads heterogeneous tabular sources into Polars DataFrames
//! behind one entry point, [`read_data`].
//!
//! # Features
//!
//! - **Location normalization**: relative, `~` and `file://` locations become
//!   absolute paths; remote URLs pass through
//! - **Format dispatch**: the file extension picks a reader from a fixed
//!   registry ([`FileFormat`])
//! - **Readers**: delimited text, spreadsheets, Stata, SPSS, R files and
//!   remote Google spreadsheets
//! - **Hierarchical headers**: multi-row headers are flattened into single
//!   column names ([`flatten_header`])
//!
//! Statistical formats return their variable and value labels alongside the
//! table as a [`LabelModel`].
//!
//! # Example
//!
//! ```ignore
//! use tidy_ingest::{LoadOptions, LoadOutput, read_data};
//!
//! let options = LoadOptions::for_location("survey.csv").with_n_headers(2);
//! if let Some(output) = read_data(&options)? {
//!     println!("{}", output.frame());
//! }
//!
//! let options = LoadOptions::for_location("~/data/panel.sav").silently(true);
//! if let Some(LoadOutput::Labelled(df, labels)) = read_data(&options)? {
//!     println!("{} rows, {} labelled variables", df.height(), labels.values().len());
//! }
//! ```

mod download;
mod error;
mod format;
mod frame;
mod header;
mod loader;
mod location;
mod readers;

// === Error Types ===
pub use error::{ErrorKind, IngestError, Result};

// === Entry Point ===
pub use loader::{BIG_DATA_NOTICE, LoadOutput, Loader, Progress, StdoutProgress, read_data};

// === Locations ===
pub use location::{ResolvedLocation, normalize_location};

// === Format Registry ===
pub use format::{FileFormat, FormatEntry, accepted_file_formats, describe_accepted_formats};

// === Readers ===
pub use readers::{
    DelimitedReader, FormatReader, RDataReader, RemoteSheetReader, SpreadsheetReader, SpssReader,
    StataReader, default_separator,
};

// === Header Flattening ===
pub use header::{FlattenOptions, HeaderBlock, apply_multiheader, combine_levels, flatten_header};

// === Table Construction ===
pub use frame::{dataset_frame, dataset_labels};

// === Shared Model ===
pub use tidy_model::{
    CombineRule, LabelModel, LoadOptions, Location, RowsRange, SheetSelector, ValueCode,
    ValueLabels,
};
