//! Stata reader.

use std::path::Path;

use tidy_model::{LabelModel, LoadOptions};
use tidy_stat::{read_dta, read_dta_labels};
use tracing::debug;

use crate::error::{Result, from_stat};
use crate::frame::dataset_frame;
use crate::loader::LoadOutput;

use super::FormatReader;

/// Reads `.dta` files; coded values are kept as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct StataReader;

impl FormatReader for StataReader {
    fn read(&self, path: &Path, _options: &LoadOptions) -> Result<LoadOutput> {
        let dataset = read_dta(path).map_err(from_stat)?;
        let df = dataset_frame(&dataset)?;

        // Second pass over the file for the label dictionaries only.
        let labels = read_dta_labels(path).map_err(from_stat)?;
        debug!(
            path = %path.display(),
            variable_labels = labels.variables.len(),
            value_label_sets = labels.values.len(),
            "read Stata labels"
        );
        let model = LabelModel::new(
            df.get_column_names_str(),
            labels.variables,
            labels.values,
        );
        Ok(LoadOutput::Labelled(df, model))
    }
}
