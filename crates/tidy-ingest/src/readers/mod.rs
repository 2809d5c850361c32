//! Format readers.
//!
//! Each reader turns one local file into a [`LoadOutput`]. Readers receive
//! the caller's options unchanged and ignore those they have no use for.

mod delimited;
mod rdata;
mod remote;
mod spreadsheet;
mod spss;
mod stata;

use std::path::Path;

use tidy_model::LoadOptions;

use crate::error::Result;
use crate::loader::LoadOutput;

pub use delimited::{DelimitedReader, default_separator};
pub use rdata::RDataReader;
pub use remote::RemoteSheetReader;
pub use spreadsheet::SpreadsheetReader;
pub use spss::SpssReader;
pub use stata::StataReader;

/// Reads one file format family.
pub trait FormatReader {
    /// Reads `path` into a table, with labels when the format carries them.
    fn read(&self, path: &Path, options: &LoadOptions) -> Result<LoadOutput>;
}
