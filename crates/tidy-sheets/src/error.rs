//! Error types for remote spreadsheet access.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while authenticating or fetching a spreadsheet.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SheetsError {
    /// Service-account key file is missing or malformed.
    #[error("invalid credentials file {path}: {message}")]
    Credentials { path: PathBuf, message: String },

    /// URL does not point at a spreadsheet.
    #[error("not a spreadsheet URL: {0}")]
    InvalidUrl(String),

    /// Token could not be signed or was refused.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network request failed.
    #[error("network error: {0}")]
    Network(String),

    /// API answered with an error status.
    #[error("spreadsheet API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Requested worksheet is absent.
    #[error("worksheet not found: {name}")]
    WorksheetNotFound { name: String },
}

/// Result type alias for spreadsheet operations.
pub type Result<T> = std::result::Result<T, SheetsError>;

impl SheetsError {
    /// Returns whether a retry could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SheetsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
