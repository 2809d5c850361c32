//! The `read_data` entry point: validation, dispatch and progress feedback.

use std::path::Path;

use polars::prelude::DataFrame;
use tidy_model::{LabelModel, LoadOptions};
use tidy_sheets::{GoogleSheetsClient, SheetSource};
use tracing::{debug, info, warn};

use crate::download::download_to_temp;
use crate::error::{IngestError, Result};
use crate::format::FileFormat;
use crate::location::{ResolvedLocation, normalize_location};
use crate::readers::RemoteSheetReader;

/// Message emitted by the bulk loading path.
pub const BIG_DATA_NOTICE: &str = "To be implemented.";

/// A loaded table, with its labels when the source format carries them.
#[derive(Debug, Clone)]
pub enum LoadOutput {
    Table(DataFrame),
    Labelled(DataFrame, LabelModel),
}

impl LoadOutput {
    #[must_use]
    pub fn frame(&self) -> &DataFrame {
        match self {
            Self::Table(df) | Self::Labelled(df, _) => df,
        }
    }

    #[must_use]
    pub fn labels(&self) -> Option<&LabelModel> {
        match self {
            Self::Table(_) => None,
            Self::Labelled(_, labels) => Some(labels),
        }
    }

    #[must_use]
    pub fn into_frame(self) -> DataFrame {
        match self {
            Self::Table(df) | Self::Labelled(df, _) => df,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (DataFrame, Option<LabelModel>) {
        match self {
            Self::Table(df) => (df, None),
            Self::Labelled(df, labels) => (df, Some(labels)),
        }
    }
}

/// Receives user-facing feedback while a table loads.
pub trait Progress {
    /// Loading of `name` has started.
    fn started(&self, name: &str);
    /// Loading has finished.
    fn finished(&self);
    /// A diagnostic message for the user.
    fn notice(&self, message: &str);
}

/// Writes feedback to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutProgress;

impl Progress for StdoutProgress {
    fn started(&self, name: &str) {
        print!("Loading data '{name}'... ");
    }

    fn finished(&self) {
        println!("done!");
    }

    fn notice(&self, message: &str) {
        println!("{message}");
    }
}

/// Loads tables from any supported source.
pub struct Loader {
    progress: Box<dyn Progress>,
    sheets: Option<Box<dyn SheetSource>>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// A loader reporting to stdout and reading remote sheets from Google.
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Box::new(StdoutProgress),
            sheets: None,
        }
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: impl Progress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Replaces the remote spreadsheet source.
    #[must_use]
    pub fn with_sheet_source(mut self, source: impl SheetSource + 'static) -> Self {
        self.sheets = Some(Box::new(source));
        self
    }

    /// Loads the table described by `options`.
    ///
    /// Returns `Ok(None)` when no reader handles the source, or on the bulk
    /// loading path.
    pub fn load(&self, options: &LoadOptions) -> Result<Option<LoadOutput>> {
        let location = normalize_location(options.location.as_ref());
        if location.is_none() && options.url.is_none() {
            return Err(IngestError::argument(
                "either a location or a url must be provided",
            ));
        }
        if let Some(ResolvedLocation::File(path)) = &location
            && !path.is_file()
        {
            return Err(IngestError::NotFound {
                what: format!("file {}", path.display()),
            });
        }

        let name = match (&options.url, &location) {
            (Some(url), _) => url.clone(),
            (None, Some(location)) => location.display_name(),
            (None, None) => String::new(),
        };

        if !options.silently {
            self.progress.started(&name);
        }
        info!(source = %name, "loading data");

        let output = if options.big_data {
            self.progress.notice(BIG_DATA_NOTICE);
            None
        } else {
            self.dispatch(location.as_ref(), options)?
        };

        if !options.silently {
            self.progress.finished();
        }
        debug!(source = %name, loaded = output.is_some(), "finished loading");
        Ok(output)
    }

    fn dispatch(
        &self,
        location: Option<&ResolvedLocation>,
        options: &LoadOptions,
    ) -> Result<Option<LoadOutput>> {
        let Some(location) = location else {
            return self.read_remote(options).map(Some);
        };

        let extension = location.extension();
        let format = extension.as_deref().and_then(FileFormat::from_extension);
        let Some(format) = format else {
            if options.url.is_some() && options.credentials.is_some() {
                return self.read_remote(options).map(Some);
            }
            let file_type = extension.map(|e| format!(".{e}")).unwrap_or_default();
            let message = format!(
                "No reader for file type {file_type}. If you are trying to read a Google \
                 spreadsheet, check the 'read_data' documentation."
            );
            warn!(file_type = %file_type, "no reader for file type");
            self.progress.notice(&message);
            return Ok(None);
        };

        match location {
            ResolvedLocation::File(path) => read_file(format, path, options).map(Some),
            ResolvedLocation::Url(url) => match url.scheme() {
                "http" | "https" => {
                    let extension = extension.unwrap_or_default();
                    let file = download_to_temp(url, &extension)?;
                    read_file(format, file.path(), options).map(Some)
                }
                scheme => Err(IngestError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                    url: url.to_string(),
                }),
            },
        }
    }

    fn read_remote(&self, options: &LoadOptions) -> Result<LoadOutput> {
        if options.credentials.is_none() {
            return Err(IngestError::argument(
                "a JSON file with the spreadsheet API credentials must be provided",
            ));
        }
        match &self.sheets {
            Some(source) => RemoteSheetReader::new(source.as_ref()).read(options),
            None => RemoteSheetReader::new(GoogleSheetsClient::new()?).read(options),
        }
    }
}

fn read_file(format: FileFormat, path: &Path, options: &LoadOptions) -> Result<LoadOutput> {
    debug!(path = %path.display(), format = format.label(), "dispatching to reader");
    format.reader().read(path, options)
}

/// Loads a table with the default [`Loader`].
pub fn read_data(options: &LoadOptions) -> Result<Option<LoadOutput>> {
    Loader::new().load(options)
}
