//! Error types for statistical file parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading Stata, SPSS or R files.
#[derive(Debug, Error)]
pub enum StatError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File content does not follow the expected layout.
    #[error("invalid {format} file: {message}")]
    InvalidFormat {
        format: &'static str,
        message: String,
    },

    /// Format revision this reader does not decode.
    #[error("unsupported {format} version: {version}")]
    UnsupportedVersion {
        format: &'static str,
        version: String,
    },

    /// Compression scheme this reader does not decode.
    #[error("unsupported compression: {scheme}")]
    UnsupportedCompression { scheme: &'static str },

    /// Input ended in the middle of a structure.
    #[error("unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// Requested object is absent from an archive.
    #[error("object {name:?} not found; available: {available:?}")]
    ObjectNotFound {
        name: String,
        available: Vec<String>,
    },

    /// Archive holds no objects at all.
    #[error("no objects found in {path}")]
    EmptyArchive { path: PathBuf },

    /// Resolved object is not tabular.
    #[error("{what} is not a data frame")]
    NotADataFrame { what: String },

    /// Requested column is absent.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, StatError>;

impl StatError {
    /// Create an InvalidFormat error.
    pub fn invalid(format: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format,
            message: message.into(),
        }
    }

    /// Create an UnsupportedVersion error.
    pub fn unsupported_version(format: &'static str, version: impl ToString) -> Self {
        Self::UnsupportedVersion {
            format,
            version: version.to_string(),
        }
    }

    /// Create a NotADataFrame error.
    pub fn not_a_data_frame(what: impl Into<String>) -> Self {
        Self::NotADataFrame { what: what.into() }
    }

    /// Returns true when the error means a requested object or file is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::ObjectNotFound { .. }
                | Self::EmptyArchive { .. }
                | Self::ColumnNotFound { .. }
        )
    }
}

/// Open a file, reporting a missing path as [`StatError::FileNotFound`].
pub(crate) fn open_file(path: &std::path::Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StatError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StatError::Io(e)
        }
    })
}

/// Read a whole file into memory.
pub(crate) fn read_file(path: &std::path::Path) -> Result<Vec<u8>> {
    use std::io::Read;

    let mut file = open_file(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}
