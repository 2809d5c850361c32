//! Error types for loading tabular data.

use std::path::PathBuf;
use thiserror::Error;
use tidy_sheets::SheetsError;
use tidy_stat::StatError;

/// Coarse classification of an [`IngestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    NotFound,
    ShapeMismatch,
    Type,
    Parse,
    Io,
}

/// Errors that can occur while loading a table.
#[derive(Debug, Error)]
pub enum IngestError {
    // === Caller Errors ===
    /// Required option missing or inconsistent.
    #[error("invalid arguments: {0}")]
    Argument(String),

    /// Separator is not a single byte.
    #[error("separator must be a single byte, got {sep:?}")]
    InvalidSeparator { sep: String },

    /// URL scheme that cannot be fetched.
    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { scheme: String, url: String },

    // === Lookup Errors ===
    /// Input file absent, or a named object absent from an archive.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Requested column absent.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    /// Requested sheet absent from a workbook.
    #[error("sheet '{sheet}' not found in {path}")]
    SheetNotFound { sheet: String, path: PathBuf },

    // === Header Errors ===
    /// Header block has no rows.
    #[error("header block is empty")]
    EmptyHeader,

    /// Header width differs from data width.
    #[error("header has {header} columns but data has {data}")]
    ShapeMismatch { data: usize, header: usize },

    // === Content Errors ===
    /// Object has the wrong shape for a table.
    #[error("type error: {message}")]
    Type { message: String },

    /// Delimited text could not be parsed.
    #[error("failed to parse {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// Workbook could not be opened or read.
    #[error("failed to read spreadsheet {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    /// Statistical file could not be parsed.
    #[error(transparent)]
    Stat(#[from] StatError),

    /// Remote spreadsheet could not be fetched.
    #[error(transparent)]
    Sheets(#[from] SheetsError),

    /// Failed table operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    // === I/O Errors ===
    /// Failed to read a file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to download a remote file.
    #[error("failed to download {url}: {message}")]
    Download { url: String, message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

impl IngestError {
    /// Create an Argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) | Self::InvalidSeparator { .. } | Self::UnsupportedScheme { .. } => {
                ErrorKind::Argument
            }
            Self::NotFound { .. } | Self::ColumnNotFound { .. } | Self::SheetNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::EmptyHeader | Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::Type { .. } => ErrorKind::Type,
            Self::CsvParse { .. } | Self::Spreadsheet { .. } | Self::DataFrame { .. } => {
                ErrorKind::Parse
            }
            Self::FileRead { .. } | Self::Download { .. } => ErrorKind::Io,
            Self::Stat(err) => match err {
                StatError::NotADataFrame { .. } => ErrorKind::Type,
                StatError::Io(_) => ErrorKind::Io,
                err if err.is_not_found() => ErrorKind::NotFound,
                _ => ErrorKind::Parse,
            },
            Self::Sheets(err) => match err {
                SheetsError::WorksheetNotFound { .. } => ErrorKind::NotFound,
                SheetsError::Credentials { .. } | SheetsError::InvalidUrl(_) => {
                    ErrorKind::Argument
                }
                _ => ErrorKind::Io,
            },
        }
    }
}

/// Convert parser errors into the loader's taxonomy.
///
/// Missing objects and non-tabular objects get their own variants so that
/// callers can match on them without reaching into [`StatError`].
pub(crate) fn from_stat(err: StatError) -> IngestError {
    match err {
        StatError::FileNotFound { path } => IngestError::NotFound {
            what: path.display().to_string(),
        },
        StatError::ObjectNotFound { name, available } => IngestError::NotFound {
            what: format!("object '{name}' (available: {})", available.join(", ")),
        },
        StatError::EmptyArchive { path } => IngestError::NotFound {
            what: format!("any object in {}", path.display()),
        },
        StatError::ColumnNotFound { column } => IngestError::ColumnNotFound { column },
        StatError::NotADataFrame { what } => IngestError::Type {
            message: format!("{what} is not a data frame"),
        },
        other => IngestError::Stat(other),
    }
}

/// Result type for loading operations.
pub type Result<T> = std::result::Result<T, IngestError>;
