//! Hierarchical header flattening.
//!
//! A header block holds one row per level, top (general) to bottom
//! (specific). Merged cells in the upper levels are blank or carry the merge
//! sentinel and inherit the nearest label to their left. Each column's clean
//! levels are then reduced to a single name:
//!
//! - a base name (first clean level) used by exactly one column stands alone;
//! - columns sharing a base name are disambiguated by the combine rule;
//! - a column with no clean level is named `column_<i>` (1-based).

mod combine;

use polars::prelude::DataFrame;
use tidy_model::{CombineRule, DEFAULT_MULTI_COL_SENTINEL, DEFAULT_PARENTHESIS_SEP, LoadOptions};
use tracing::debug;

use crate::error::{IngestError, Result};

pub use combine::combine_levels;

/// Header rows of a table, one row per level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    rows: Vec<Vec<Option<String>>>,
}

impl HeaderBlock {
    /// Builds a block, padding short rows with missing cells.
    #[must_use]
    pub fn new(mut rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, None);
        }
        Self { rows }
    }

    /// Builds a block from text cells; empty strings stay empty strings.
    pub fn from_text<R, C, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(|cell| Some(cell.into())).collect())
                .collect(),
        )
    }

    /// Number of levels.
    #[must_use]
    pub fn levels(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }
}

/// Settings for [`flatten_header`].
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    pub combine: CombineRule,
    pub parenthesis_sep: String,
    pub sentinel: String,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            combine: CombineRule::default(),
            parenthesis_sep: DEFAULT_PARENTHESIS_SEP.to_string(),
            sentinel: DEFAULT_MULTI_COL_SENTINEL.to_string(),
        }
    }
}

impl From<&LoadOptions> for FlattenOptions {
    fn from(options: &LoadOptions) -> Self {
        Self {
            combine: options.header_combine_rule.clone(),
            parenthesis_sep: options.combine_parenthesis_sep.clone(),
            sentinel: options.multi_col_sentinel.clone(),
        }
    }
}

fn is_missing(cell: Option<&str>, sentinel: &str) -> bool {
    match cell {
        None => true,
        Some(text) => text.is_empty() || text == sentinel,
    }
}

/// Computes flattened column names for a table `width` columns wide.
pub fn flatten_header(
    block: &HeaderBlock,
    width: usize,
    options: &FlattenOptions,
) -> Result<Vec<String>> {
    let n_levels = block.levels();
    if n_levels == 0 {
        return Err(IngestError::EmptyHeader);
    }
    if block.width() != width {
        return Err(IngestError::ShapeMismatch {
            data: width,
            header: block.width(),
        });
    }

    let mut rows: Vec<Vec<Option<String>>> = block.rows.clone();
    let (upper, last) = rows.split_at_mut(n_levels - 1);

    // Merged cells inherit from the left; nothing fills before the first label.
    for row in upper.iter_mut() {
        let mut last_seen: Option<String> = None;
        for cell in row.iter_mut() {
            if is_missing(cell.as_deref(), &options.sentinel) {
                cell.clone_from(&last_seen);
            } else {
                last_seen.clone_from(cell);
            }
        }
    }
    for cell in last[0].iter_mut() {
        if is_missing(cell.as_deref(), &options.sentinel) {
            *cell = None;
        }
    }

    let clean: Vec<Vec<String>> = (0..width)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row[col].as_deref())
                .map(str::trim)
                .filter(|level| !level.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect();

    let base_count = |base: &str| {
        clean
            .iter()
            .filter(|levels| levels.first().is_some_and(|b| b == base))
            .count()
    };

    let names: Vec<String> = clean
        .iter()
        .enumerate()
        .map(|(idx, levels)| match levels.first() {
            None => format!("column_{}", idx + 1),
            Some(base) if base_count(base) == 1 => base.clone(),
            Some(_) => combine_levels(&options.combine, levels, &options.parenthesis_sep),
        })
        .collect();

    debug!(levels = n_levels, columns = width, "flattened header");
    Ok(names)
}

/// Renames the columns of `data` from a header block.
///
/// The shape is checked before any column is renamed. Colliding names are
/// passed to the table as they are and rejected there.
pub fn apply_multiheader(
    mut data: DataFrame,
    block: &HeaderBlock,
    options: &FlattenOptions,
) -> Result<DataFrame> {
    let names = flatten_header(block, data.width(), options)?;
    data.set_column_names(names)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, NamedFrom, Series};

    fn frame(width: usize) -> DataFrame {
        let columns: Vec<Column> = (0..width)
            .map(|i| Series::new(format!("c{i}").into(), &[i as i64]).into())
            .collect();
        DataFrame::new(columns).unwrap()
    }

    fn cell(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    #[test]
    fn test_disambiguates_shared_base() {
        let block = HeaderBlock::from_text([["Party", "Party", "Age"], ["Code", "Value", "Value"]]);
        let names = flatten_header(&block, 3, &FlattenOptions::default()).unwrap();
        assert_eq!(names, vec!["Party (Code)", "Party (Value)", "Age"]);
    }

    #[test]
    fn test_forward_fill_merged_cell() {
        let block = HeaderBlock::new(vec![
            vec![cell("Party"), None, cell("Age")],
            vec![cell("Code"), cell("Value"), cell("")],
        ]);
        let names = flatten_header(&block, 3, &FlattenOptions::default()).unwrap();
        assert_eq!(names, vec!["Party (Code)", "Party (Value)", "Age"]);
    }

    #[test]
    fn test_sentinel_fills_and_last_row_cleans() {
        let block = HeaderBlock::from_text([
            ["Income", "None", "None", "Region"],
            ["2019", "2020", "None", ""],
        ]);
        let names = flatten_header(&block, 4, &FlattenOptions::default()).unwrap();
        assert_eq!(
            names,
            vec!["Income (2019)", "Income (2020)", "Income", "Region"]
        );
    }

    #[test]
    fn test_no_fill_before_first_label() {
        let block = HeaderBlock::from_text([["", "Group", ""], ["", "a", "b"]]);
        let names = flatten_header(&block, 3, &FlattenOptions::default()).unwrap();
        assert_eq!(names, vec!["column_1", "Group (a)", "Group (b)"]);
    }

    #[test]
    fn test_custom_sentinel_and_separator() {
        let block = HeaderBlock::from_text([["Score", "-", "-"], ["x", "y", "z"]]);
        let options = FlattenOptions {
            sentinel: "-".to_string(),
            parenthesis_sep: "; ".to_string(),
            ..FlattenOptions::default()
        };
        let names = flatten_header(&block, 3, &options).unwrap();
        assert_eq!(names, vec!["Score (x)", "Score (y)", "Score (z)"]);

        let block = HeaderBlock::from_text([["Score", "Score"], ["x", "y"], ["1", "2"]]);
        let names = flatten_header(&block, 2, &options).unwrap();
        assert_eq!(names, vec!["Score (x; 1)", "Score (y; 2)"]);
    }

    #[test]
    fn test_underscore_rule() {
        let block = HeaderBlock::from_text([["Party", "Party"], ["Code", "Value"]]);
        let options = FlattenOptions {
            combine: CombineRule::Underscore,
            ..FlattenOptions::default()
        };
        let names = flatten_header(&block, 2, &options).unwrap();
        assert_eq!(names, vec!["Party_Code", "Party_Value"]);
    }

    #[test]
    fn test_levels_are_trimmed() {
        let block = HeaderBlock::from_text([["  Age ", " Sex"]]);
        let names = flatten_header(&block, 2, &FlattenOptions::default()).unwrap();
        assert_eq!(names, vec!["Age", "Sex"]);
    }

    #[test]
    fn test_empty_header() {
        let err = flatten_header(&HeaderBlock::default(), 2, &FlattenOptions::default());
        assert!(matches!(err, Err(IngestError::EmptyHeader)));
    }

    #[test]
    fn test_shape_mismatch_before_rename() {
        let data = frame(3);
        let block = HeaderBlock::from_text([["a", "b"]]);
        let err = apply_multiheader(data.clone(), &block, &FlattenOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::ShapeMismatch { data: 3, header: 2 }));
        assert_eq!(data.get_column_names_str(), vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn test_apply_multiheader_renames_in_order() {
        let block = HeaderBlock::from_text([["Party", "Party", "Age"], ["Code", "Value", ""]]);
        let df = apply_multiheader(frame(3), &block, &FlattenOptions::default()).unwrap();
        assert_eq!(
            df.get_column_names_str(),
            vec!["Party (Code)", "Party (Value)", "Age"]
        );
    }

    #[test]
    fn test_colliding_names_are_rejected_by_the_table() {
        let block = HeaderBlock::from_text([["A", "A"], ["x", "x"]]);
        let err = apply_multiheader(frame(2), &block, &FlattenOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::DataFrame { .. }));
    }
}
