//! Spreadsheet reader (Excel and OpenDocument workbooks).

use std::collections::HashMap;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series, TimeUnit};
use tidy_model::{LoadOptions, SheetSelector};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::frame::generic_name;
use crate::header::{FlattenOptions, HeaderBlock, apply_multiheader};
use crate::loader::LoadOutput;

use super::FormatReader;

/// Excel serial day of 1970-01-01.
const UNIX_EPOCH_SERIAL: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Reads one worksheet with calamine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetReader;

impl FormatReader for SpreadsheetReader {
    fn read(&self, path: &Path, options: &LoadOptions) -> Result<LoadOutput> {
        let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::Spreadsheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let selector = options.sheet_name.clone().unwrap_or_default();
        let sheet_names = workbook.sheet_names();
        let sheet = match &selector {
            SheetSelector::Name(name) => sheet_names.iter().find(|s| *s == name).cloned(),
            SheetSelector::Index(index) => sheet_names.get(*index).cloned(),
        }
        .ok_or_else(|| IngestError::SheetNotFound {
            sheet: selector.to_string(),
            path: path.to_path_buf(),
        })?;

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| IngestError::Spreadsheet {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let rows: Vec<&[Data]> = range.rows().collect();
        let n_headers = options.header_rows();
        debug!(path = %path.display(), sheet = %sheet, rows = rows.len(), n_headers, "reading worksheet");

        let df = if n_headers > 0 {
            let split = n_headers.min(rows.len());
            let (header, body) = rows.split_at(split);
            let block = HeaderBlock::new(
                header
                    .iter()
                    .map(|row| row.iter().map(header_cell).collect())
                    .collect(),
            );
            let names: Vec<String> = (0..range.width()).map(generic_name).collect();
            let data = typed_frame(&names, body)?;
            apply_multiheader(data, &block, &FlattenOptions::from(options))?
        } else {
            match rows.split_first() {
                Some((header, body)) => typed_frame(&column_names(header), body)?,
                None => DataFrame::empty(),
            }
        };

        debug!(rows = df.height(), columns = df.width(), "read worksheet");
        Ok(LoadOutput::Table(df))
    }
}

fn header_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        other => Some(other.to_string()),
    }
}

/// Names from a header row: blanks become `Unnamed: <idx>`, repeats get
/// `.1`, `.2`, ... suffixes.
fn column_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let base = match header_cell(cell) {
            Some(text) if !text.is_empty() => text,
            _ => format!("Unnamed: {idx}"),
        };
        let mut name = base.clone();
        if let Some(&used) = seen.get(&base) {
            let mut count = used;
            loop {
                count += 1;
                name = format!("{base}.{count}");
                if !seen.contains_key(&name) {
                    break;
                }
            }
            seen.insert(base, count);
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }
    names
}

/// Inferred element type of a worksheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

fn is_blank(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

fn infer(cells: &[&Data]) -> CellKind {
    let mut kind: Option<CellKind> = None;
    for cell in cells.iter().filter(|c| !is_blank(c)) {
        let this = match cell {
            Data::Int(_) => CellKind::Int,
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            Data::DateTime(_) => CellKind::DateTime,
            _ => CellKind::Text,
        };
        kind = Some(match (kind, this) {
            (None, this) => this,
            (Some(prev), this) if prev == this => prev,
            (Some(CellKind::Int | CellKind::Float), CellKind::Int | CellKind::Float) => {
                CellKind::Float
            }
            _ => return CellKind::Text,
        });
    }
    kind.unwrap_or(CellKind::Text)
}

fn column(name: &str, cells: &[&Data]) -> Result<Column> {
    let name = name.into();
    let series = match infer(cells) {
        CellKind::Int => Series::new(
            name,
            cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(v) => Some(*v),
                    Data::Float(v) => Some(*v as i64),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        CellKind::Float => Series::new(
            name,
            cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(v) => Some(*v as f64),
                    Data::Float(v) => Some(*v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        CellKind::Bool => Series::new(
            name,
            cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(v) => Some(*v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        CellKind::DateTime => Series::new(
            name,
            cells
                .iter()
                .map(|cell| match cell {
                    Data::DateTime(v) => {
                        Some(((v.as_f64() - UNIX_EPOCH_SERIAL) * MILLIS_PER_DAY).round() as i64)
                    }
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        CellKind::Text => Series::new(
            name,
            cells
                .iter()
                .map(|cell| (!is_blank(cell)).then(|| cell.to_string()))
                .collect::<Vec<_>>(),
        ),
    };
    Ok(series.into())
}

/// Builds a table from worksheet rows, one typed column per name.
fn typed_frame(names: &[String], rows: &[&[Data]]) -> Result<DataFrame> {
    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            column(name, &cells)
        })
        .collect::<Result<Vec<Column>>>()?;
    Ok(DataFrame::new(columns)?)
}
