//! Parser output types shared by all formats.

use std::collections::BTreeMap;

use tidy_model::ValueLabels;

/// Column data in a format-neutral representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
    /// Days since 1970-01-01.
    Date(Vec<Option<i32>>),
    /// Milliseconds since the Unix epoch.
    DateTime(Vec<Option<i64>>),
    /// Codes index into `levels` (0-based).
    Factor {
        codes: Vec<Option<u32>>,
        levels: Vec<String>,
    },
}

impl ColumnValues {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) | Self::DateTime(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Date(v) => v.len(),
            Self::Factor { codes, .. } => codes.len(),
        }
    }

    /// Returns true when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Factor { .. } => "factor",
        }
    }
}

/// A single variable of a parsed dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct StatColumn {
    pub name: String,
    /// Variable label, when the file carries one.
    pub label: Option<String>,
    pub values: ColumnValues,
    /// Code → label mapping attached to this variable.
    pub value_labels: ValueLabels,
}

impl StatColumn {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            label: None,
            values,
            value_labels: ValueLabels::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A parsed table with its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatDataset {
    /// Dataset (file) label.
    pub label: Option<String>,
    pub columns: Vec<StatColumn>,
}

impl StatDataset {
    /// Number of rows (0 when there are no columns).
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Finds a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&StatColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Variable name → raw label, for every column.
    #[must_use]
    pub fn variable_labels(&self) -> BTreeMap<String, Option<String>> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.label.clone()))
            .collect()
    }

    /// Variable name → code labels, for columns that have any.
    #[must_use]
    pub fn value_labels(&self) -> BTreeMap<String, ValueLabels> {
        self.columns
            .iter()
            .filter(|c| !c.value_labels.is_empty())
            .map(|c| (c.name.clone(), c.value_labels.clone()))
            .collect()
    }
}

/// Labels read from a file without decoding its observations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLabels {
    /// Variable name → raw label.
    pub variables: BTreeMap<String, Option<String>>,
    /// Variable name → code labels.
    pub values: BTreeMap<String, ValueLabels>,
}
