//! R serialized data reader (`.rds`, `.RData`, `.rda`).

use std::path::Path;

use tidy_model::LoadOptions;
use tidy_stat::read_r;

use crate::error::{Result, from_stat};
use crate::frame::{dataset_frame, dataset_labels};
use crate::loader::LoadOutput;

use super::FormatReader;

/// Reads a data frame from an R file.
///
/// `object_name` picks an object out of an archive; otherwise the first
/// data frame is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct RDataReader;

impl FormatReader for RDataReader {
    fn read(&self, path: &Path, options: &LoadOptions) -> Result<LoadOutput> {
        let dataset = read_r(path, options.object_name.as_deref()).map_err(from_stat)?;
        let df = dataset_frame(&dataset)?;
        let labels = dataset_labels(&df, &dataset);
        Ok(LoadOutput::Labelled(df, labels))
    }
}
