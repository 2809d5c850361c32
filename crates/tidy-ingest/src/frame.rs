//! DataFrame construction from parser output and text grids.

use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series, TimeUnit};
use tidy_model::LabelModel;
use tidy_stat::{ColumnValues, StatColumn, StatDataset};

use crate::error::Result;

/// Builds a table from a parsed statistical dataset.
///
/// Factors become string columns holding their level text; dates and
/// date-times keep their temporal type.
pub fn dataset_frame(dataset: &StatDataset) -> Result<DataFrame> {
    let columns = dataset
        .columns
        .iter()
        .map(stat_column)
        .collect::<Result<Vec<Column>>>()?;
    Ok(DataFrame::new(columns)?)
}

fn stat_column(column: &StatColumn) -> Result<Column> {
    let name = column.name.as_str().into();
    let series = match &column.values {
        ColumnValues::Int(values) => Series::new(name, values),
        ColumnValues::Float(values) => Series::new(name, values),
        ColumnValues::Text(values) => Series::new(name, values),
        ColumnValues::Bool(values) => Series::new(name, values),
        ColumnValues::Date(days) => Series::new(name, days).cast(&DataType::Date)?,
        ColumnValues::DateTime(millis) => Series::new(name, millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        ColumnValues::Factor { codes, levels } => {
            let text: Vec<Option<&str>> = codes
                .iter()
                .map(|code| {
                    code.and_then(|c| levels.get(c as usize))
                        .map(String::as_str)
                })
                .collect();
            Series::new(name, text)
        }
    };
    Ok(series.into())
}

/// Builds the label model for a table produced from `dataset`.
///
/// `frame` supplies the final column names; the dataset supplies the raw
/// label dictionaries.
#[must_use]
pub fn dataset_labels(frame: &DataFrame, dataset: &StatDataset) -> LabelModel {
    LabelModel::new(
        frame.get_column_names_str(),
        dataset.variable_labels(),
        dataset.value_labels(),
    )
}

/// Builds an all-string table from rows of text, naming columns
/// `column_1..column_n`. Empty cells stay empty strings.
pub fn text_frame(rows: &[Vec<String>], width: usize) -> Result<DataFrame> {
    let columns: Vec<Column> = (0..width)
        .map(|col| {
            let values: Vec<&str> = rows
                .iter()
                .map(|row| row.get(col).map_or("", String::as_str))
                .collect();
            Series::new(generic_name(col).into(), values).into()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Placeholder name of a column before the header is applied.
pub(crate) fn generic_name(idx: usize) -> String {
    format!("column_{}", idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::AnyValue;
    use std::collections::BTreeMap;
    use tidy_model::ValueCode;

    fn dataset() -> StatDataset {
        let mut sex = StatColumn::new(
            "sex",
            ColumnValues::Int(vec![Some(1), Some(2), None]),
        )
        .with_label("Respondent sex");
        sex.value_labels = BTreeMap::from([
            (ValueCode::Int(1), "Male".to_string()),
            (ValueCode::Int(2), "Female".to_string()),
        ]);
        StatDataset {
            label: None,
            columns: vec![
                sex,
                StatColumn::new(
                    "region",
                    ColumnValues::Factor {
                        codes: vec![Some(1), None, Some(0)],
                        levels: vec!["North".to_string(), "South".to_string()],
                    },
                ),
                StatColumn::new(
                    "visit",
                    ColumnValues::Date(vec![Some(0), Some(19_000), None]),
                ),
            ],
        }
    }

    #[test]
    fn test_dataset_frame_types() {
        let df = dataset_frame(&dataset()).unwrap();
        assert_eq!(df.shape(), (3, 3));
        assert_eq!(df.column("sex").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("region").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("visit").unwrap().dtype(), &DataType::Date);

        let region = df.column("region").unwrap().str().unwrap();
        assert_eq!(region.get(0), Some("South"));
        assert_eq!(region.get(1), None);
        assert_eq!(region.get(2), Some("North"));
        assert!(matches!(
            df.column("sex").unwrap().get(2).unwrap(),
            AnyValue::Null
        ));
    }

    #[test]
    fn test_dataset_labels_fall_back_to_names() {
        let data = dataset();
        let df = dataset_frame(&data).unwrap();
        let labels = dataset_labels(&df, &data);
        assert_eq!(labels.variable_label("sex"), Some("Respondent sex"));
        assert_eq!(labels.variable_label("region"), Some("region"));
        assert_eq!(labels.value_label("sex", &ValueCode::Int(2)), Some("Female"));
        assert!(!labels.values().contains_key("region"));
    }

    #[test]
    fn test_text_frame_pads_short_rows() {
        let rows = vec![
            vec!["a".to_string(), "1".to_string()],
            vec!["b".to_string()],
        ];
        let df = text_frame(&rows, 2).unwrap();
        assert_eq!(df.get_column_names_str(), vec!["column_1", "column_2"]);
        let second = df.column("column_2").unwrap().str().unwrap();
        assert_eq!(second.get(1), Some(""));
    }
}
