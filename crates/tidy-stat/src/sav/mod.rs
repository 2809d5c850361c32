//! SPSS system file reader (`.sav`, and zlib-compressed `.zsav`).
//!
//! System-missing and user-missing values are returned as nulls. Variables
//! with a date or datetime print format become [`ColumnValues::Date`] and
//! [`ColumnValues::DateTime`].

mod cases;
mod dictionary;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tidy_model::{ValueCode, ValueLabels};
use tracing::{debug, warn};

pub use dictionary::Compression;

use crate::bytes::Endian;
use crate::error::{Result, StatError, read_file};
use crate::temporal::{spss_seconds_to_unix_days, spss_seconds_to_unix_millis};
use crate::types::{ColumnValues, StatColumn, StatDataset};
use dictionary::{RawVariable, SavDictionary, key_value_pairs, parse_dictionary};

const DATE_FORMATS: [u32; 8] = [20, 23, 24, 28, 29, 30, 38, 39];
const DATETIME_FORMATS: [u32; 2] = [22, 86];
// Very long strings are split into segments carrying this many bytes.
const SEGMENT_BYTES: usize = 252;

/// Column and row selection applied while decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavOptions {
    /// Variables to keep (file order is preserved); `None` keeps all.
    pub cols: Option<Vec<String>>,
    /// Cases to skip from the start.
    pub row_offset: usize,
    /// Maximum cases to return; 0 means no limit.
    pub row_limit: usize,
}

impl SavOptions {
    #[must_use]
    pub fn with_cols(mut self, cols: Vec<String>) -> Self {
        self.cols = Some(cols);
        self
    }

    #[must_use]
    pub fn with_rows(mut self, offset: usize, limit: usize) -> Self {
        self.row_offset = offset;
        self.row_limit = limit;
        self
    }
}

/// Read an SPSS system file.
pub fn read_sav(path: &Path, options: &SavOptions) -> Result<StatDataset> {
    let data = read_file(path)?;
    let dataset = parse_sav(&data, options)?;
    debug!(
        path = %path.display(),
        rows = dataset.num_rows(),
        columns = dataset.columns.len(),
        "read SPSS file"
    );
    Ok(dataset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Numeric,
    Date,
    DateTime,
    Text,
}

/// A user-visible variable, possibly spanning several dictionary entries.
#[derive(Debug)]
struct Variable {
    name: String,
    label: Option<String>,
    kind: Kind,
    /// `(first slot, bytes used)` per segment.
    segments: Vec<(usize, usize)>,
    missing: Missing,
    value_labels: ValueLabels,
    /// 1-based dictionary index of the first segment.
    dict_index: usize,
}

#[derive(Debug, Default)]
enum Missing {
    #[default]
    None,
    Discrete(Vec<f64>),
    Range {
        low: f64,
        high: f64,
        extra: Option<f64>,
    },
    Text(Vec<String>),
}

impl Missing {
    fn numeric_is_missing(&self, value: f64) -> bool {
        match self {
            Self::Discrete(values) => values.contains(&value),
            Self::Range { low, high, extra } => {
                (*low..=*high).contains(&value) || *extra == Some(value)
            }
            Self::None | Self::Text(_) => false,
        }
    }

    fn text_is_missing(&self, value: &str) -> bool {
        match self {
            Self::Text(values) => values.iter().any(|m| m == value),
            _ => false,
        }
    }
}

/// Parse an in-memory SPSS system file.
pub fn parse_sav(data: &[u8], options: &SavOptions) -> Result<StatDataset> {
    let dict = parse_dictionary(data)?;
    let encoding = file_encoding(&dict);
    let mut variables = resolve_variables(&dict, encoding);

    if let Some(cols) = &options.cols {
        if let Some(missing) = cols.iter().find(|c| !variables.iter().any(|v| &v.name == *c)) {
            return Err(StatError::ColumnNotFound {
                column: missing.clone(),
            });
        }
        variables.retain(|v| cols.contains(&v.name));
    }

    let slots_per_case = dict.variables.len();
    let case_size = slots_per_case * 8;
    let buffer = cases::case_slots(data, &dict)?;
    let available = if case_size == 0 { 0 } else { buffer.len() / case_size };
    let ncases = dict.ncases.map_or(available, |n| n.min(available));

    let first = options.row_offset.min(ncases);
    let last = if options.row_limit == 0 {
        ncases
    } else {
        first.saturating_add(options.row_limit).min(ncases)
    };

    let columns = variables
        .into_iter()
        .map(|var| {
            let rows = (first..last).map(|case| &buffer[case * case_size..(case + 1) * case_size]);
            let values = decode_column(&var, rows, &dict, encoding);
            StatColumn {
                name: var.name,
                label: var.label,
                values,
                value_labels: var.value_labels,
            }
        })
        .collect();

    let label = decode(encoding, &dict.file_label);
    Ok(StatDataset {
        label: (!label.is_empty()).then_some(label),
        columns,
    })
}

fn file_encoding(dict: &SavDictionary) -> &'static Encoding {
    if let Some(name) = &dict.encoding_name {
        if let Some(encoding) = Encoding::for_label(name.as_bytes()) {
            return encoding;
        }
        warn!(encoding = %name, "unknown SPSS encoding, falling back to windows-1252");
    }
    match dict.character_code {
        Some(65001) => UTF_8,
        Some(code @ 1250..=1258) => {
            Encoding::for_label(format!("windows-{code}").as_bytes()).unwrap_or(WINDOWS_1252)
        }
        Some(code @ 28591..=28605) => {
            Encoding::for_label(format!("iso-8859-{}", code - 28590).as_bytes())
                .unwrap_or(WINDOWS_1252)
        }
        _ => WINDOWS_1252,
    }
}

fn decode(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.trim_end_matches([' ', '\0']).to_string()
}

fn resolve_variables(dict: &SavDictionary, encoding: &'static Encoding) -> Vec<Variable> {
    let long_names: HashMap<String, String> = dict
        .long_names
        .as_deref()
        .map(|bytes| {
            key_value_pairs(bytes, b'\t')
                .into_iter()
                .map(|(k, v)| (decode(encoding, &k), decode(encoding, &v)))
                .collect()
        })
        .unwrap_or_default();
    let very_long: HashMap<String, usize> = dict
        .very_long_strings
        .as_deref()
        .map(|bytes| {
            key_value_pairs(bytes, b'\t')
                .into_iter()
                .filter_map(|(k, v)| {
                    let width = String::from_utf8_lossy(&v).trim().parse().ok()?;
                    Some((decode(encoding, &k), width))
                })
                .collect()
        })
        .unwrap_or_default();

    // (slot, record) for every non-continuation entry.
    let entries: Vec<(usize, &RawVariable)> = dict
        .variables
        .iter()
        .enumerate()
        .filter(|(_, raw)| !raw.is_continuation())
        .collect();

    let mut variables = Vec::new();
    let mut idx = 0;
    while idx < entries.len() {
        let (slot, raw) = entries[idx];
        let mut segments = Vec::new();
        let kind = if raw.width == 0 {
            segments.push((slot, 8));
            idx += 1;
            match raw.format_type() {
                code if DATE_FORMATS.contains(&code) => Kind::Date,
                code if DATETIME_FORMATS.contains(&code) => Kind::DateTime,
                _ => Kind::Numeric,
            }
        } else if let Some(&width) = very_long.get(&raw.short_name) {
            let count = width.div_ceil(SEGMENT_BYTES).max(1);
            for seg in 0..count {
                let Some(&(seg_slot, _)) = entries.get(idx + seg) else {
                    break;
                };
                let used = if seg + 1 == count {
                    width - SEGMENT_BYTES * seg
                } else {
                    SEGMENT_BYTES
                };
                segments.push((seg_slot, used));
            }
            idx += count;
            Kind::Text
        } else {
            segments.push((slot, raw.width.unsigned_abs() as usize));
            idx += 1;
            Kind::Text
        };

        let name = long_names
            .get(&raw.short_name)
            .cloned()
            .unwrap_or_else(|| raw.short_name.clone());
        let label = raw
            .label
            .as_deref()
            .map(|bytes| decode(encoding, bytes))
            .filter(|label| !label.trim().is_empty());

        variables.push(Variable {
            name,
            label,
            kind,
            segments,
            missing: missing_values(raw, kind, dict.endian, encoding),
            value_labels: ValueLabels::new(),
            dict_index: slot + 1,
        });
    }

    attach_value_labels(&mut variables, dict, encoding);
    variables
}

fn slot_f64(raw: &[u8], endian: Endian) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[..8]);
    match endian {
        Endian::Little => f64::from_le_bytes(bytes),
        Endian::Big => f64::from_be_bytes(bytes),
    }
}

fn missing_values(
    raw: &RawVariable,
    kind: Kind,
    endian: Endian,
    encoding: &'static Encoding,
) -> Missing {
    if raw.missing.is_empty() {
        return Missing::None;
    }
    if kind == Kind::Text {
        return Missing::Text(raw.missing.iter().map(|m| decode(encoding, m)).collect());
    }
    let values: Vec<f64> = raw.missing.iter().map(|m| slot_f64(m, endian)).collect();
    match (raw.missing_kind, values.as_slice()) {
        (-2, [low, high]) => Missing::Range {
            low: *low,
            high: *high,
            extra: None,
        },
        (-3, [low, high, extra]) => Missing::Range {
            low: *low,
            high: *high,
            extra: Some(*extra),
        },
        _ => Missing::Discrete(values),
    }
}

fn attach_value_labels(
    variables: &mut [Variable],
    dict: &SavDictionary,
    encoding: &'static Encoding,
) {
    let by_index: HashMap<usize, usize> = variables
        .iter()
        .enumerate()
        .map(|(pos, var)| (var.dict_index, pos))
        .collect();

    for set in &dict.value_labels {
        for index in &set.variables {
            let Some(&pos) = by_index.get(index) else {
                continue;
            };
            let var = &mut variables[pos];
            for (value, label) in &set.entries {
                let code = if var.kind == Kind::Text {
                    ValueCode::Text(decode(encoding, value))
                } else {
                    ValueCode::from_f64(slot_f64(value, dict.endian))
                };
                let label = decode(encoding, label);
                if !label.trim().is_empty() {
                    var.value_labels.insert(code, label);
                }
            }
        }
    }

    let by_name: BTreeMap<String, usize> = variables
        .iter()
        .enumerate()
        .map(|(pos, var)| (var.name.clone(), pos))
        .collect();
    for set in &dict.long_string_labels {
        let Some(&pos) = by_name.get(&decode(encoding, &set.variable)) else {
            continue;
        };
        for (value, label) in &set.entries {
            let label = decode(encoding, label);
            if !label.trim().is_empty() {
                variables[pos]
                    .value_labels
                    .insert(ValueCode::Text(decode(encoding, value)), label);
            }
        }
    }
}

fn decode_column<'a>(
    var: &Variable,
    rows: impl Iterator<Item = &'a [u8]>,
    dict: &SavDictionary,
    encoding: &'static Encoding,
) -> ColumnValues {
    if var.kind == Kind::Text {
        let values = rows
            .map(|case| {
                let mut bytes = Vec::new();
                for &(slot, used) in &var.segments {
                    let start = slot * 8;
                    let end = (start + used).min(case.len());
                    bytes.extend_from_slice(&case[start.min(end)..end]);
                }
                let text = decode(encoding, &bytes);
                (!var.missing.text_is_missing(&text)).then_some(text)
            })
            .collect();
        return ColumnValues::Text(values);
    }

    let slot = var.segments.first().map_or(0, |(slot, _)| *slot);
    let numbers = rows.map(|case| {
        let value = slot_f64(&case[slot * 8..slot * 8 + 8], dict.endian);
        let missing =
            value.is_nan() || value == dict.sysmis || var.missing.numeric_is_missing(value);
        (!missing).then_some(value)
    });
    match var.kind {
        Kind::Date => ColumnValues::Date(
            numbers
                .map(|v| v.and_then(spss_seconds_to_unix_days))
                .collect(),
        ),
        Kind::DateTime => ColumnValues::DateTime(
            numbers
                .map(|v| v.and_then(spss_seconds_to_unix_millis))
                .collect(),
        ),
        _ => ColumnValues::Float(numbers.collect()),
    }
}
