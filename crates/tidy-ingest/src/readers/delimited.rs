//! Delimited text reader (`.csv`, `.tsv`, `.dat`, `.txt`).

use std::path::{Path, PathBuf};

use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use tidy_model::LoadOptions;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::header::{FlattenOptions, HeaderBlock, apply_multiheader};
use crate::loader::LoadOutput;

use super::FormatReader;

/// Rows sampled for schema inference.
const INFER_SCHEMA_ROWS: usize = 100;

/// Reads delimited text with polars.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedReader;

/// Separator used when none is given, keyed by extension.
#[must_use]
pub fn default_separator(extension: &str) -> &'static str {
    match extension {
        "tsv" | "TSV" | "txt" | "TXT" => "\t",
        "dat" | "DAT" => " ",
        _ => ";",
    }
}

fn separator_byte(sep: &str) -> Result<u8> {
    match sep.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(IngestError::InvalidSeparator {
            sep: sep.to_string(),
        }),
    }
}

fn csv_error(path: &Path) -> impl Fn(polars::prelude::PolarsError) -> IngestError + '_ {
    move |e| IngestError::CsvParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Reads the table body with polars, optionally skipping a header block.
fn read_body(path: &Path, separator: u8, skip_rows: usize) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(skip_rows == 0)
        .with_skip_rows(skip_rows)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .map_parse_options(|parse| parse.with_separator(separator))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .map_err(csv_error(path))?
        .finish()
        .map_err(csv_error(path))
}

/// Reads the first `n` records as raw header cells.
fn read_header_block(path: &Path, separator: u8, n: usize) -> Result<HeaderBlock> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(separator)
        .from_path(path)
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut rows = Vec::with_capacity(n);
    for record in reader.records().take(n) {
        let record = record.map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        rows.push(
            record
                .iter()
                .map(|cell| Some(cell.to_string()))
                .collect::<Vec<_>>(),
        );
    }
    Ok(HeaderBlock::new(rows))
}

impl FormatReader for DelimitedReader {
    fn read(&self, path: &Path, options: &LoadOptions) -> Result<LoadOutput> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sep = options
            .sep
            .as_deref()
            .unwrap_or_else(|| default_separator(&extension));
        let separator = separator_byte(sep)?;
        let n_headers = options.header_rows();

        debug!(
            path = %path.display(),
            separator = ?char::from(separator),
            n_headers,
            "reading delimited text"
        );

        let df = if n_headers > 0 {
            let data = read_body(path, separator, n_headers)?;
            let block = read_header_block(path, separator, n_headers)?;
            apply_multiheader(data, &block, &FlattenOptions::from(options))?
        } else {
            read_body(path, separator, 0)?
        };

        debug!(rows = df.height(), columns = df.width(), "read delimited text");
        Ok(LoadOutput::Table(df))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_default_separator() {
        assert_eq!(default_separator("tsv"), "\t");
        assert_eq!(default_separator("TXT"), "\t");
        assert_eq!(default_separator("DAT"), " ");
        assert_eq!(default_separator("csv"), ";");
        assert_eq!(default_separator("CSV"), ";");
    }

    #[test]
    fn test_semicolon_is_the_csv_default() {
        let file = temp_file(".csv", "a;b\n1;x\n2;y\n");
        let df = DelimitedReader
            .read(file.path(), &LoadOptions::default())
            .unwrap()
            .into_frame();
        assert_eq!(df.get_column_names_str(), vec!["a", "b"]);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_tab_separated() {
        let file = temp_file(".tsv", "a\tb\n1\t2\n");
        let df = DelimitedReader
            .read(file.path(), &LoadOptions::default())
            .unwrap()
            .into_frame();
        assert_eq!(df.shape(), (1, 2));
    }

    #[test]
    fn test_separator_override() {
        let file = temp_file(".csv", "a,b,c\n1,2,3\n");
        let options = LoadOptions::default().with_sep(",");
        let df = DelimitedReader.read(file.path(), &options).unwrap().into_frame();
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_multibyte_separator_rejected() {
        let file = temp_file(".csv", "a,b\n");
        let options = LoadOptions::default().with_sep("::");
        let err = DelimitedReader.read(file.path(), &options).unwrap_err();
        assert!(matches!(err, IngestError::InvalidSeparator { .. }));
    }

    #[test]
    fn test_header_block_is_flattened() {
        let file = temp_file(
            ".csv",
            "Party;;Age;Gender\nCode;Value;;\n1;Dem;23;M\n0;Rep;33;F\n",
        );
        let options = LoadOptions::default().with_n_headers(2);
        let df = DelimitedReader.read(file.path(), &options).unwrap().into_frame();
        assert_eq!(
            df.get_column_names_str(),
            vec!["Party (Code)", "Party (Value)", "Age", "Gender"]
        );
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_header_width_mismatch() {
        let file = temp_file(".csv", "A;B;C\n1;2\n");
        let options = LoadOptions::default().with_n_headers(1);
        let err = DelimitedReader.read(file.path(), &options).unwrap_err();
        assert!(matches!(
            err,
            IngestError::ShapeMismatch { data: 2, header: 3 }
        ));
    }
}
