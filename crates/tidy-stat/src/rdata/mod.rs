//! R serialized data reader (`.rds`, `.RData`/`.rda`).
//!
//! Files may be gzip-compressed or plain and use the XDR (`X`) or native
//! binary (`B`) serialization. A `.rds` file saved with `save()` is
//! recognised by its `RDX2`/`RDX3` magic and read as an archive.

mod sexp;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tidy_model::{ValueCode, ValueLabels};
use tracing::debug;

pub use sexp::{RKind, RObject, StreamHeader, unserialize};

use crate::error::{Result, StatError, read_file};
use crate::temporal::{r_days_to_unix, r_seconds_to_unix_millis};
use crate::types::{ColumnValues, StatColumn, StatDataset};
use sexp::FORMAT;

/// Top-level content of an R file.
#[derive(Debug, Clone, PartialEq)]
pub enum RFile {
    /// A single object written by `saveRDS`.
    Single(RObject),
    /// Named objects written by `save`.
    Archive(Vec<(String, RObject)>),
}

/// Read a data frame from an R file.
///
/// For archives, `object_name` selects the object; without it the first
/// object that is a data frame is used.
pub fn read_r(path: &Path, object_name: Option<&str>) -> Result<StatDataset> {
    let data = read_file(path)?;
    let file = parse_r_file(&data)?;
    let (name, object) = select_object(file, object_name, path)?;
    let dataset = data_frame(&object, &name)?;
    debug!(
        path = %path.display(),
        object = %name,
        rows = dataset.num_rows(),
        columns = dataset.columns.len(),
        "read R object"
    );
    Ok(dataset)
}

/// Decompresses and decodes an in-memory R file.
pub fn parse_r_file(data: &[u8]) -> Result<RFile> {
    let raw = decompress(data)?;
    let bytes = raw.as_slice();
    match bytes.get(..5) {
        Some(b"RDX2\n" | b"RDX3\n" | b"RDB2\n" | b"RDB3\n") => {
            let (_, object) = unserialize(&bytes[5..])?;
            Ok(RFile::Archive(archive_entries(object)?))
        }
        Some(b"RDA2\n" | b"RDA3\n") => {
            Err(StatError::unsupported_version(FORMAT, "ASCII archive"))
        }
        _ => {
            let (_, object) = unserialize(bytes)?;
            Ok(RFile::Single(object))
        }
    }
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.starts_with(&[0x1f, 0x8b]) {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    } else if data.starts_with(b"BZh") {
        Err(StatError::UnsupportedCompression { scheme: "bzip2" })
    } else if data.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
        Err(StatError::UnsupportedCompression { scheme: "xz" })
    } else {
        Ok(data.to_vec())
    }
}

fn archive_entries(object: RObject) -> Result<Vec<(String, RObject)>> {
    match object.kind {
        RKind::Pairlist(items) => Ok(items
            .into_iter()
            .map(|(tag, value)| (tag.unwrap_or_default(), value))
            .collect()),
        RKind::Null => Ok(Vec::new()),
        _ => Err(StatError::invalid(FORMAT, "archive is not a pairlist")),
    }
}

fn select_object(
    file: RFile,
    object_name: Option<&str>,
    path: &Path,
) -> Result<(String, RObject)> {
    let fallback = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let entries = match file {
        RFile::Single(object) => return Ok((fallback, object)),
        RFile::Archive(entries) => entries,
    };
    if entries.is_empty() {
        return Err(StatError::EmptyArchive {
            path: path.to_path_buf(),
        });
    }
    match object_name {
        Some(name) => {
            let available = entries.iter().map(|(n, _)| n.clone()).collect();
            entries
                .into_iter()
                .find(|(n, _)| n == name)
                .ok_or_else(|| StatError::ObjectNotFound {
                    name: name.to_string(),
                    available,
                })
        }
        None => {
            let first = entries[0].0.clone();
            entries
                .into_iter()
                .find(|(_, object)| is_data_frame(object))
                .ok_or_else(|| StatError::not_a_data_frame(first))
        }
    }
}

/// True for list objects whose class includes `data.frame`.
#[must_use]
pub fn is_data_frame(object: &RObject) -> bool {
    matches!(object.kind, RKind::List(_)) && object.inherits("data.frame")
}

/// Converts a data frame object, keeping variable and value labels.
pub fn data_frame(object: &RObject, name: &str) -> Result<StatDataset> {
    let RKind::List(columns) = &object.kind else {
        return Err(StatError::not_a_data_frame(name));
    };
    if !object.inherits("data.frame") {
        return Err(StatError::not_a_data_frame(name));
    }
    let names = object.string_attr("names").unwrap_or_default();

    let mut out = Vec::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        let col_name = names
            .get(idx)
            .cloned()
            .flatten()
            .unwrap_or_else(|| format!("V{}", idx + 1));
        let values = column_values(column, &col_name)?;
        let mut stat = StatColumn::new(col_name, values);
        stat.label = variable_label(column);
        stat.value_labels = value_labels(column);
        out.push(stat);
    }

    let rows = row_count(object).unwrap_or_else(|| out.first().map_or(0, |c| c.values.len()));
    if let Some(bad) = out.iter().find(|c| c.values.len() != rows) {
        return Err(StatError::invalid(
            FORMAT,
            format!(
                "column '{}' has {} rows, expected {rows}",
                bad.name,
                bad.values.len()
            ),
        ));
    }

    Ok(StatDataset {
        label: None,
        columns: out,
    })
}

fn row_count(object: &RObject) -> Option<usize> {
    let row_names = object.attr("row.names")?;
    match &row_names.kind {
        // Compact form c(NA, -n) or c(NA, n).
        RKind::Integer(v) if v.len() == 2 && v[0].is_none() => {
            v[1].map(|n| n.unsigned_abs() as usize)
        }
        _ => Some(row_names.len()),
    }
}

fn variable_label(column: &RObject) -> Option<String> {
    column
        .string_attr("label")?
        .into_iter()
        .flatten()
        .next()
        .filter(|label| !label.trim().is_empty())
}

fn value_labels(column: &RObject) -> ValueLabels {
    let Some(labels) = column.attr("labels") else {
        return ValueLabels::new();
    };
    let names = labels.string_attr("names").unwrap_or_default();
    let codes: Vec<Option<ValueCode>> = match &labels.kind {
        RKind::Integer(v) => v.iter().map(|c| c.map(|c| ValueCode::Int(c.into()))).collect(),
        RKind::Real(v) => v
            .iter()
            .map(|c| (!c.is_nan()).then(|| ValueCode::from_f64(*c)))
            .collect(),
        RKind::Character(v) => v.iter().map(|c| c.clone().map(ValueCode::Text)).collect(),
        RKind::Logical(v) => v
            .iter()
            .map(|c| c.map(|c| ValueCode::Int(i64::from(c))))
            .collect(),
        _ => Vec::new(),
    };
    codes
        .into_iter()
        .zip(names)
        .filter_map(|(code, label)| Some((code?, label?)))
        .filter(|(_, label)| !label.trim().is_empty())
        .collect()
}

fn column_values(column: &RObject, name: &str) -> Result<ColumnValues> {
    let values = match &column.kind {
        RKind::Integer(v) if column.inherits("factor") => {
            let levels = column
                .string_attr("levels")
                .unwrap_or_default()
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect::<Vec<_>>();
            let codes = v
                .iter()
                .map(|code| {
                    code.and_then(|c| u32::try_from(c).ok())
                        .and_then(|c| c.checked_sub(1))
                        .filter(|c| (*c as usize) < levels.len())
                })
                .collect();
            ColumnValues::Factor { codes, levels }
        }
        RKind::Integer(v) if column.inherits("Date") => ColumnValues::Date(
            v.iter()
                .map(|d| d.and_then(|d| r_days_to_unix(f64::from(d))))
                .collect(),
        ),
        RKind::Real(v) if column.inherits("Date") => {
            ColumnValues::Date(v.iter().map(|d| r_days_to_unix(*d)).collect())
        }
        RKind::Real(v) if column.inherits("POSIXct") => {
            ColumnValues::DateTime(v.iter().map(|s| r_seconds_to_unix_millis(*s)).collect())
        }
        RKind::Integer(v) => ColumnValues::Int(v.iter().map(|x| x.map(i64::from)).collect()),
        RKind::Real(v) => {
            ColumnValues::Float(v.iter().map(|x| (!x.is_nan()).then_some(*x)).collect())
        }
        RKind::Logical(v) => ColumnValues::Bool(v.clone()),
        RKind::Character(v) => character_factor(v),
        other => {
            return Err(StatError::not_a_data_frame(format!(
                "column '{name}' of kind {}",
                kind_name(other)
            )));
        }
    };
    Ok(values)
}

/// Character vectors become factors with sorted unique levels.
fn character_factor(values: &[Option<String>]) -> ColumnValues {
    let levels: Vec<String> = values
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let codes = values
        .iter()
        .map(|v| {
            v.as_ref()
                .and_then(|v| levels.binary_search(v).ok())
                .and_then(|i| u32::try_from(i).ok())
        })
        .collect();
    ColumnValues::Factor { codes, levels }
}

fn kind_name(kind: &RKind) -> &'static str {
    match kind {
        RKind::Null => "NULL",
        RKind::Symbol(_) => "symbol",
        RKind::Char(_) => "char",
        RKind::Pairlist(_) => "pairlist",
        RKind::Logical(_) => "logical",
        RKind::Integer(_) => "integer",
        RKind::Real(_) => "double",
        RKind::Complex(_) => "complex",
        RKind::Character(_) => "character",
        RKind::List(_) => "list",
        RKind::Raw(_) => "raw",
        RKind::Opaque(what) => what,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> RObject {
        RObject::new(RKind::Character(
            values.iter().map(|v| Some((*v).to_string())).collect(),
        ))
    }

    fn frame(columns: Vec<RObject>, names: &[&str]) -> RObject {
        let rows = columns.first().map_or(0, RObject::len) as i32;
        RObject {
            kind: RKind::List(columns),
            attributes: vec![
                ("names".to_string(), strings(names)),
                ("class".to_string(), strings(&["data.frame"])),
                (
                    "row.names".to_string(),
                    RObject::new(RKind::Integer(vec![None, Some(-rows)])),
                ),
            ],
        }
    }

    #[test]
    fn test_character_column_becomes_factor() {
        let df = frame(vec![strings(&["b", "a", "b"])], &["x"]);
        let dataset = data_frame(&df, "df").unwrap();
        assert_eq!(
            dataset.columns[0].values,
            ColumnValues::Factor {
                codes: vec![Some(1), Some(0), Some(1)],
                levels: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_labels_read_before_conversion() {
        let mut codes = RObject::new(RKind::Real(vec![1.0, 2.0]));
        codes.attributes.push(("names".to_string(), strings(&["Male", "Female"])));
        let mut sex = RObject::new(RKind::Real(vec![1.0, 2.0, f64::NAN]));
        sex.attributes.push(("label".to_string(), strings(&["Sex"])));
        sex.attributes.push(("labels".to_string(), codes));

        let dataset = data_frame(&frame(vec![sex], &["sex"]), "df").unwrap();
        let column = &dataset.columns[0];
        assert_eq!(column.label.as_deref(), Some("Sex"));
        assert_eq!(
            column.value_labels.get(&ValueCode::Int(2)).map(String::as_str),
            Some("Female")
        );
        assert_eq!(
            column.values,
            ColumnValues::Float(vec![Some(1.0), Some(2.0), None])
        );
    }

    #[test]
    fn test_plain_vector_is_not_a_data_frame() {
        let vector = RObject::new(RKind::Integer(vec![Some(1)]));
        assert!(matches!(
            data_frame(&vector, "v"),
            Err(StatError::NotADataFrame { .. })
        ));
    }

    #[test]
    fn test_compressed_formats_rejected() {
        assert!(matches!(
            parse_r_file(b"BZh91AY&SY"),
            Err(StatError::UnsupportedCompression { scheme: "bzip2" })
        ));
    }
}
