//! Stata `.dta` reader (releases 113–115 and 117–119).
//!
//! Values are returned as stored: labelled codes stay numeric and the
//! code → label tables are attached to each column through its
//! value label name. Dates with a `%td`/`%tc` display format become
//! [`ColumnValues::Date`]/[`ColumnValues::DateTime`].

mod header;
mod values;

use std::path::Path;

use tracing::debug;

pub use header::{DtaHeader, DtaType, parse_header};

use crate::error::{Result, read_file};
use crate::types::{ColumnValues, FileLabels, StatColumn, StatDataset};

/// Read a Stata file with its observations.
pub fn read_dta(path: &Path) -> Result<StatDataset> {
    let data = read_file(path)?;
    let dataset = parse_dta(&data)?;
    debug!(
        path = %path.display(),
        rows = dataset.num_rows(),
        columns = dataset.columns.len(),
        "read Stata file"
    );
    Ok(dataset)
}

/// Read only the variable and value labels of a Stata file.
pub fn read_dta_labels(path: &Path) -> Result<FileLabels> {
    let data = read_file(path)?;
    parse_dta_labels(&data)
}

/// Parse an in-memory Stata file.
pub fn parse_dta(data: &[u8]) -> Result<StatDataset> {
    let header = parse_header(data)?;
    let columns = values::read_observations(data, &header)?;
    let tables = values::read_value_label_tables(data, &header)?;

    let columns = columns
        .into_iter()
        .enumerate()
        .map(|(idx, values)| build_column(&header, idx, values, &tables))
        .collect();

    Ok(StatDataset {
        label: header.data_label.clone(),
        columns,
    })
}

/// Parse the label metadata of an in-memory Stata file.
pub fn parse_dta_labels(data: &[u8]) -> Result<FileLabels> {
    let header = parse_header(data)?;
    let tables = values::read_value_label_tables(data, &header)?;

    let mut labels = FileLabels::default();
    for (idx, name) in header.names.iter().enumerate() {
        labels
            .variables
            .insert(name.clone(), non_blank(&header.variable_labels[idx]));
        if let Some(table) = tables.get(&header.value_label_names[idx])
            && !table.is_empty()
        {
            labels.values.insert(name.clone(), table.clone());
        }
    }
    Ok(labels)
}

fn build_column(
    header: &DtaHeader,
    idx: usize,
    values: ColumnValues,
    tables: &std::collections::BTreeMap<String, tidy_model::ValueLabels>,
) -> StatColumn {
    let mut column = StatColumn::new(header.names[idx].clone(), values);
    column.label = non_blank(&header.variable_labels[idx]);
    if let Some(table) = tables.get(&header.value_label_names[idx]) {
        column.value_labels = table.clone();
    }
    column
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
