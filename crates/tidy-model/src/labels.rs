//! Variable and value label metadata attached to a loaded table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::ValueCode;

/// Per-variable code → label mapping.
pub type ValueLabels = BTreeMap<ValueCode, String>;

/// Normalized label metadata for one loaded table.
///
/// Built once from the raw dictionaries a reader extracts and never mutated
/// afterwards:
///
/// - every name in [`original`](Self::original) has a variable label, falling
///   back to the variable name itself;
/// - raw variable labels that are missing or blank are discarded before the
///   fallback is applied;
/// - variables without any value label are absent from
///   [`values`](Self::values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelModel {
    original: Vec<String>,
    variables: BTreeMap<String, String>,
    values: BTreeMap<String, ValueLabels>,
}

/// Serializable view with only the label dictionaries.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LabelDict<'a> {
    pub variables: &'a BTreeMap<String, String>,
    pub values: &'a BTreeMap<String, ValueLabels>,
}

impl LabelModel {
    /// Builds a label model from raw reader output.
    ///
    /// `variables` may contain entries for names that are not in `original`;
    /// those are dropped. `values` is kept for any variable with at least one
    /// code label.
    pub fn new<I, S>(
        original: I,
        variables: BTreeMap<String, Option<String>>,
        values: BTreeMap<String, ValueLabels>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let original: Vec<String> = original.into_iter().map(Into::into).collect();

        let extracted: BTreeMap<String, String> = variables
            .into_iter()
            .filter_map(|(name, label)| match label {
                Some(label) if !label.trim().is_empty() => Some((name, label)),
                _ => None,
            })
            .collect();

        let variables = original
            .iter()
            .map(|name| {
                let label = extracted.get(name).unwrap_or(name).clone();
                (name.clone(), label)
            })
            .collect();

        let values = values
            .into_iter()
            .filter(|(_, mapping)| !mapping.is_empty())
            .collect();

        Self {
            original,
            variables,
            values,
        }
    }

    /// Variable names as they existed in the source table.
    pub fn original(&self) -> &[String] {
        &self.original
    }

    /// Variable name → display label.
    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Variable name → code → label.
    pub fn values(&self) -> &BTreeMap<String, ValueLabels> {
        &self.values
    }

    /// Display label of a variable.
    pub fn variable_label(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Label attached to a code of a variable.
    pub fn value_label(&self, name: &str, code: &ValueCode) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|mapping| mapping.get(code))
            .map(String::as_str)
    }

    /// Iterates `(name, label)` pairs in source column order.
    pub fn variables_in_order(&self) -> impl Iterator<Item = (&str, &str)> {
        self.original.iter().filter_map(|name| {
            self.variables
                .get(name)
                .map(|label| (name.as_str(), label.as_str()))
        })
    }

    /// Returns the label dictionaries without the original name list.
    pub fn as_dict(&self) -> LabelDict<'_> {
        LabelDict {
            variables: &self.variables,
            values: &self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_vars(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_blank_labels_fall_back_to_name() {
        let labels = LabelModel::new(
            ["age", "sex", "id"],
            raw_vars(&[("age", Some("Age in years")), ("sex", Some("   ")), ("id", None)]),
            BTreeMap::new(),
        );
        assert_eq!(labels.variable_label("age"), Some("Age in years"));
        assert_eq!(labels.variable_label("sex"), Some("sex"));
        assert_eq!(labels.variable_label("id"), Some("id"));
    }

    #[test]
    fn test_labels_outside_original_are_dropped() {
        let labels = LabelModel::new(
            ["a"],
            raw_vars(&[("a", Some("A")), ("ghost", Some("Ghost"))]),
            BTreeMap::new(),
        );
        assert_eq!(labels.variables().len(), 1);
        assert!(labels.variable_label("ghost").is_none());
    }

    #[test]
    fn test_empty_value_mappings_are_omitted() {
        let mut values = BTreeMap::new();
        values.insert("sex".to_string(), ValueLabels::new());
        let mut party = ValueLabels::new();
        party.insert(ValueCode::Int(1), "Dem".to_string());
        values.insert("party".to_string(), party);

        let labels = LabelModel::new(["sex", "party"], BTreeMap::new(), values);
        assert!(!labels.values().contains_key("sex"));
        assert_eq!(labels.value_label("party", &ValueCode::Int(1)), Some("Dem"));
    }

    #[test]
    fn test_repeated_name_keeps_its_label() {
        let labels = LabelModel::new(
            ["a", "a", "b"],
            raw_vars(&[("a", Some("Label A"))]),
            BTreeMap::new(),
        );
        assert_eq!(labels.variable_label("a"), Some("Label A"));
        assert_eq!(labels.variable_label("b"), Some("b"));
        assert_eq!(labels.original().len(), 3);
    }

    #[test]
    fn test_ordered_iteration_follows_source_columns() {
        let labels = LabelModel::new(["z", "a", "m"], BTreeMap::new(), BTreeMap::new());
        let names: Vec<&str> = labels.variables_in_order().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }
}
