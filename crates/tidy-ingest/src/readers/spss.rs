//! SPSS reader.

use std::path::Path;

use tidy_model::LoadOptions;
use tidy_stat::{SavOptions, read_sav};

use crate::error::{Result, from_stat};
use crate::frame::{dataset_frame, dataset_labels};
use crate::loader::LoadOutput;

use super::FormatReader;

/// Reads `.sav` files, honoring the column subset and row window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpssReader;

/// Maps loader options to parser options.
///
/// The 1-based inclusive row window becomes a 0-based offset and a limit;
/// no window reads every case.
#[must_use]
pub fn sav_options(options: &LoadOptions) -> SavOptions {
    let mut sav = SavOptions::default();
    if let Some(cols) = &options.cols {
        sav = sav.with_cols(cols.clone());
    }
    if let Some(range) = options.rows_range {
        let (offset, limit) = range.to_offset_limit();
        sav = sav.with_rows(offset, limit);
    }
    sav
}

impl FormatReader for SpssReader {
    fn read(&self, path: &Path, options: &LoadOptions) -> Result<LoadOutput> {
        let dataset = read_sav(path, &sav_options(options)).map_err(from_stat)?;
        let df = dataset_frame(&dataset)?;
        let labels = dataset_labels(&df, &dataset);
        Ok(LoadOutput::Labelled(df, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidy_model::RowsRange;

    #[test]
    fn test_rows_range_to_offset_limit() {
        let options = LoadOptions::default().with_rows_range(RowsRange::new(3, 7).unwrap());
        let sav = sav_options(&options);
        assert_eq!((sav.row_offset, sav.row_limit), (2, 5));
    }

    #[test]
    fn test_defaults_read_everything() {
        let sav = sav_options(&LoadOptions::default());
        assert_eq!(sav, SavOptions::default());
        assert_eq!(sav.row_limit, 0);
    }

    #[test]
    fn test_cols_are_forwarded() {
        let options = LoadOptions::default().with_cols(["age", "sex"]);
        assert_eq!(
            sav_options(&options).cols,
            Some(vec!["age".to_string(), "sex".to_string()])
        );
    }
}
