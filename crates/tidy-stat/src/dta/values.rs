//! Observation, strL and value label decoding.

use std::collections::{BTreeMap, HashMap};

use tidy_model::{ValueCode, ValueLabels};

use super::header::{DtaHeader, DtaType, FORMAT, decode_text};
use crate::bytes::{ByteCursor, Endian, until_nul};
use crate::error::{Result, StatError};
use crate::temporal::{stata_days_to_unix, stata_millis_to_unix};
use crate::types::ColumnValues;

// Largest non-missing values per storage type.
const MAX_BYTE: i8 = 100;
const MAX_INT: i16 = 32_740;
const MAX_LONG: i32 = 2_147_483_620;
const MAX_FLOAT_BITS: u32 = 0x7eff_ffff;
const MAX_DOUBLE_BITS: u64 = 0x7fdf_ffff_ffff_ffff;

/// Temporal interpretation taken from a display format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Temporal {
    None,
    Date,
    DateTime,
}

fn temporal_kind(format: &str) -> Temporal {
    let fmt = format.trim_start_matches('%').trim_start_matches('-');
    if fmt.starts_with("td") || fmt.starts_with('d') {
        Temporal::Date
    } else if fmt.starts_with("tc") || fmt.starts_with("tC") {
        Temporal::DateTime
    } else {
        Temporal::None
    }
}

enum Builder {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// Decodes every observation into column vectors.
pub fn read_observations(data: &[u8], header: &DtaHeader) -> Result<Vec<ColumnValues>> {
    let strls = match header.strls_offset {
        Some(offset) if header.types.contains(&DtaType::StrL) => read_strls(data, header, offset)?,
        _ => HashMap::new(),
    };

    let record_width = header.row_width();
    let available = data.len().saturating_sub(header.data_offset);
    match header.nobs.checked_mul(record_width) {
        Some(needed) if needed <= available => {}
        _ => {
            return Err(StatError::invalid(
                FORMAT,
                format!(
                    "{} observations of {record_width} bytes exceed the {available} bytes of data",
                    header.nobs
                ),
            ));
        }
    }
    let nobs = if record_width == 0 { 0 } else { header.nobs };

    let mut builders: Vec<Builder> = header
        .types
        .iter()
        .map(|ty| match ty {
            DtaType::Str(_) | DtaType::StrL => Builder::Text(Vec::with_capacity(nobs)),
            DtaType::Byte | DtaType::Int | DtaType::Long => {
                Builder::Int(Vec::with_capacity(nobs))
            }
            DtaType::Float | DtaType::Double => Builder::Float(Vec::with_capacity(nobs)),
        })
        .collect();

    let mut cur = ByteCursor::new(data, header.endian);
    cur.seek(header.data_offset)?;
    for _ in 0..nobs {
        for (ty, builder) in header.types.iter().zip(builders.iter_mut()) {
            match (ty, builder) {
                (DtaType::Byte, Builder::Int(v)) => {
                    let raw = cur.i8()?;
                    v.push((raw <= MAX_BYTE).then_some(i64::from(raw)));
                }
                (DtaType::Int, Builder::Int(v)) => {
                    let raw = cur.i16()?;
                    v.push((raw <= MAX_INT).then_some(i64::from(raw)));
                }
                (DtaType::Long, Builder::Int(v)) => {
                    let raw = cur.i32()?;
                    v.push((raw <= MAX_LONG).then_some(i64::from(raw)));
                }
                (DtaType::Float, Builder::Float(v)) => {
                    let raw = cur.f32()?;
                    v.push(float_value(raw));
                }
                (DtaType::Double, Builder::Float(v)) => {
                    let raw = cur.f64()?;
                    v.push(double_value(raw));
                }
                (DtaType::Str(len), Builder::Text(v)) => {
                    v.push(Some(header.decode_text(cur.take(*len)?)));
                }
                (DtaType::StrL, Builder::Text(v)) => {
                    let key = strl_key(cur.take(8)?, header);
                    let text = if key == (0, 0) {
                        String::new()
                    } else {
                        strls.get(&key).cloned().ok_or_else(|| {
                            StatError::invalid(
                                FORMAT,
                                format!("strL ({}, {}) has no GSO entry", key.0, key.1),
                            )
                        })?
                    };
                    v.push(Some(text));
                }
                _ => return Err(StatError::invalid(FORMAT, "column builder mismatch")),
            }
        }
    }

    Ok(builders
        .into_iter()
        .zip(&header.formats)
        .map(|(builder, format)| finish(builder, temporal_kind(format)))
        .collect())
}

fn finish(builder: Builder, temporal: Temporal) -> ColumnValues {
    match (builder, temporal) {
        (Builder::Text(v), _) => ColumnValues::Text(v),
        (Builder::Int(v), Temporal::None) => ColumnValues::Int(v),
        (Builder::Float(v), Temporal::None) => ColumnValues::Float(v),
        (Builder::Int(v), Temporal::Date) => ColumnValues::Date(
            v.into_iter()
                .map(|d| d.and_then(|d| stata_days_to_unix(d as f64)))
                .collect(),
        ),
        (Builder::Float(v), Temporal::Date) => ColumnValues::Date(
            v.into_iter()
                .map(|d| d.and_then(stata_days_to_unix))
                .collect(),
        ),
        (Builder::Int(v), Temporal::DateTime) => ColumnValues::DateTime(
            v.into_iter()
                .map(|ms| ms.and_then(|ms| stata_millis_to_unix(ms as f64)))
                .collect(),
        ),
        (Builder::Float(v), Temporal::DateTime) => ColumnValues::DateTime(
            v.into_iter()
                .map(|ms| ms.and_then(stata_millis_to_unix))
                .collect(),
        ),
    }
}

fn float_value(raw: f32) -> Option<f64> {
    let bits = raw.to_bits();
    let missing = raw.is_nan() || (bits & 0x8000_0000 == 0 && bits > MAX_FLOAT_BITS);
    (!missing).then_some(f64::from(raw))
}

fn double_value(raw: f64) -> Option<f64> {
    let bits = raw.to_bits();
    let missing = raw.is_nan() || (bits >> 63 == 0 && bits > MAX_DOUBLE_BITS);
    (!missing).then_some(raw)
}

/// Splits an 8-byte strL reference into `(variable, observation)`.
fn strl_key(bytes: &[u8], header: &DtaHeader) -> (u64, u64) {
    let split = match header.release {
        117 => 4,
        118 => 2,
        _ => 3,
    };
    let (v, o) = bytes.split_at(split);
    (uint(v, header.endian), uint(o, header.endian))
}

fn uint(bytes: &[u8], endian: Endian) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    match endian {
        Endian::Big => bytes.iter().fold(0, fold),
        Endian::Little => bytes.iter().rev().fold(0, fold),
    }
}

fn read_strls(data: &[u8], header: &DtaHeader, offset: usize) -> Result<HashMap<(u64, u64), String>> {
    let mut cur = ByteCursor::new(data, header.endian);
    cur.seek(offset)?;
    cur.expect(FORMAT, b"<strls>")?;
    let mut out = HashMap::new();
    while cur.peek(3) == Some(b"GSO") {
        cur.skip(3)?;
        let v = u64::from(cur.u32()?);
        let o = if header.release == 117 {
            u64::from(cur.u32()?)
        } else {
            cur.u64()?
        };
        let kind = cur.u8()?;
        let len = cur.u32()? as usize;
        let bytes = cur.take(len)?;
        let text = match kind {
            // ASCII/UTF-8 payload carries its terminator.
            130 => decode_text(until_nul(bytes), header.is_utf8()),
            _ => String::from_utf8_lossy(bytes).into_owned(),
        };
        out.insert((v, o), text);
    }
    cur.expect(FORMAT, b"</strls>")?;
    Ok(out)
}

/// Reads every value label table, keyed by table name.
pub fn read_value_label_tables(
    data: &[u8],
    header: &DtaHeader,
) -> Result<BTreeMap<String, ValueLabels>> {
    let mut cur = ByteCursor::new(data, header.endian);
    let width = header.label_name_width();
    let mut tables = BTreeMap::new();

    match header.value_labels_offset {
        Some(offset) => {
            cur.seek(offset)?;
            cur.expect(FORMAT, b"<value_labels>")?;
            while cur.peek(5) == Some(b"<lbl>") {
                cur.skip(5)?;
                let len = cur.u32()? as usize;
                let name = header.decode_text(cur.take(width)?);
                cur.skip(3)?;
                let table = parse_table(cur.take(len)?, header)?;
                cur.expect(FORMAT, b"</lbl>")?;
                tables.insert(name, table);
            }
            cur.expect(FORMAT, b"</value_labels>")?;
        }
        None => {
            let end = header
                .row_width()
                .checked_mul(header.nobs)
                .and_then(|len| len.checked_add(header.data_offset))
                .ok_or_else(|| StatError::invalid(FORMAT, "data section overflows"))?;
            cur.seek(end)?;
            // Legacy files end with zero or more tables and no terminator.
            while cur.remaining() >= 4 + width + 3 {
                let len = cur.u32()? as usize;
                let name = header.decode_text(cur.take(width)?);
                cur.skip(3)?;
                let table = parse_table(cur.take(len)?, header)?;
                tables.insert(name, table);
            }
        }
    }
    Ok(tables)
}

fn parse_table(bytes: &[u8], header: &DtaHeader) -> Result<ValueLabels> {
    let mut cur = ByteCursor::new(bytes, header.endian);
    let count = cur.u32()? as usize;
    let text_len = cur.u32()? as usize;
    let offsets = (0..count)
        .map(|_| Ok(cur.u32()? as usize))
        .collect::<Result<Vec<_>>>()?;
    let values = (0..count)
        .map(|_| cur.i32())
        .collect::<Result<Vec<_>>>()?;
    let text = cur.take(text_len)?;

    let mut table = ValueLabels::new();
    for (offset, value) in offsets.into_iter().zip(values) {
        let Some(slice) = text.get(offset..) else {
            return Err(StatError::invalid(
                FORMAT,
                format!("value label offset {offset} outside text block"),
            ));
        };
        let label = header.decode_text(slice);
        if !label.trim().is_empty() {
            table.insert(ValueCode::Int(i64::from(value)), label);
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_formats() {
        assert_eq!(temporal_kind("%td"), Temporal::Date);
        assert_eq!(temporal_kind("%tdD_m_Y"), Temporal::Date);
        assert_eq!(temporal_kind("%d"), Temporal::Date);
        assert_eq!(temporal_kind("%tc"), Temporal::DateTime);
        assert_eq!(temporal_kind("%tC"), Temporal::DateTime);
        assert_eq!(temporal_kind("%9.0g"), Temporal::None);
        assert_eq!(temporal_kind("%-12s"), Temporal::None);
    }

    #[test]
    fn test_float_missing_thresholds() {
        assert_eq!(float_value(1.5), Some(1.5));
        assert_eq!(float_value(f32::from_bits(0x7f00_0000)), None);
        assert_eq!(float_value(-3.0e38), Some(f64::from(-3.0e38_f32)));
        assert_eq!(double_value(8.0e307), Some(8.0e307));
        assert_eq!(double_value(f64::from_bits(0x7fe0_0000_0000_0000)), None);
        assert_eq!(double_value(f64::NAN), None);
    }

    #[test]
    fn test_uint_byte_orders() {
        assert_eq!(uint(&[1, 0], Endian::Little), 1);
        assert_eq!(uint(&[0, 1], Endian::Big), 1);
        assert_eq!(uint(&[0x02, 0x01, 0, 0, 0, 0], Endian::Little), 0x0102);
    }
}
