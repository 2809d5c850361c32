//! Remote spreadsheet reader.

use tidy_model::{DEFAULT_REMOTE_SHEET, LoadOptions, SheetSelector};
use tidy_sheets::SheetSource;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::frame::text_frame;
use crate::header::{FlattenOptions, HeaderBlock, apply_multiheader};
use crate::loader::LoadOutput;
use crate::location::resolve_path;

/// Reads a worksheet of a remote spreadsheet through a [`SheetSource`].
///
/// Every cell arrives as text, so all columns are strings. The first
/// `n_headers` rows (one unless set) are the header block.
#[derive(Debug, Clone)]
pub struct RemoteSheetReader<S> {
    source: S,
}

impl<S: SheetSource> RemoteSheetReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn read(&self, options: &LoadOptions) -> Result<LoadOutput> {
        let credentials = options.credentials.as_deref().ok_or_else(|| {
            IngestError::argument(
                "a JSON file with the spreadsheet API credentials must be provided",
            )
        })?;
        let url = options
            .url
            .as_deref()
            .ok_or_else(|| IngestError::argument("the spreadsheet URL must be provided"))?;
        let credentials = resolve_path(credentials);
        let sheet = options
            .sheet_name
            .clone()
            .unwrap_or_else(|| SheetSelector::Name(DEFAULT_REMOTE_SHEET.to_string()));

        debug!(url, sheet = %sheet, credentials = %credentials.display(), "fetching worksheet");
        let rows = self.source.fetch_rows(&credentials, url, &sheet)?;

        let n_headers = options.remote_header_rows().min(rows.len());
        let (header, body) = rows.split_at(n_headers);
        let block = HeaderBlock::from_text(header.iter().map(|row| row.iter().cloned()));
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let data = text_frame(body, width)?;
        let df = apply_multiheader(data, &block, &FlattenOptions::from(options))?;

        debug!(rows = df.height(), columns = df.width(), "read worksheet");
        Ok(LoadOutput::Table(df))
    }
}
