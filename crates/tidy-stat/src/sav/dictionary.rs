//! SPSS file header and dictionary records.
//!
//! Record types handled:
//!
//! | Type | Subtype | Content |
//! |------|---------|---------|
//! | 2    |         | variable (one per 8-byte slot, `-1` = continuation) |
//! | 3/4  |         | value labels and the variables they apply to |
//! | 6    |         | documents (skipped) |
//! | 7    | 3       | integer info (character code) |
//! | 7    | 4       | float info (system-missing value) |
//! | 7    | 13      | long variable names |
//! | 7    | 14      | very long string widths |
//! | 7    | 20      | character encoding name |
//! | 7    | 21      | long string value labels |
//! | 999  |         | end of dictionary |

use crate::bytes::{ByteCursor, Endian};
use crate::error::{Result, StatError};

pub(crate) const FORMAT: &str = "SPSS";

/// Case data compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Bytecode,
    Zlib,
}

/// One type-2 record.
#[derive(Debug, Clone)]
pub struct RawVariable {
    /// 0 numeric, >0 string width, -1 continuation slot.
    pub width: i32,
    pub short_name: String,
    pub label: Option<Vec<u8>>,
    pub print_format: u32,
    /// Missing value count as stored (`-2`/`-3` denote a range).
    pub missing_kind: i32,
    pub missing: Vec<[u8; 8]>,
}

impl RawVariable {
    pub fn is_continuation(&self) -> bool {
        self.width < 0
    }

    /// Format type code of the print format.
    pub fn format_type(&self) -> u32 {
        (self.print_format >> 16) & 0xff
    }
}

/// One type-3 record with the dictionary indices of its type-4 companion.
#[derive(Debug, Clone, Default)]
pub struct RawValueLabels {
    pub entries: Vec<([u8; 8], Vec<u8>)>,
    /// 1-based dictionary indices.
    pub variables: Vec<usize>,
}

/// Labels of one long string variable (subtype 21).
#[derive(Debug, Clone)]
pub struct LongStringLabels {
    pub variable: Vec<u8>,
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

/// Everything before the case data.
#[derive(Debug, Clone)]
pub struct SavDictionary {
    pub endian: Endian,
    pub compression: Compression,
    pub bias: f64,
    pub ncases: Option<usize>,
    pub file_label: Vec<u8>,
    pub variables: Vec<RawVariable>,
    pub value_labels: Vec<RawValueLabels>,
    pub long_string_labels: Vec<LongStringLabels>,
    pub long_names: Option<Vec<u8>>,
    pub very_long_strings: Option<Vec<u8>>,
    pub encoding_name: Option<String>,
    pub character_code: Option<i32>,
    pub sysmis: f64,
    /// Offset right after the 999 record.
    pub data_offset: usize,
}

/// Parses the header and every dictionary record.
pub fn parse_dictionary(data: &[u8]) -> Result<SavDictionary> {
    let mut cur = ByteCursor::new(data, Endian::Little);
    let magic = cur.take(4)?;
    let zlib_magic = match magic {
        b"$FL2" => false,
        b"$FL3" => true,
        other => {
            return Err(StatError::unsupported_version(
                FORMAT,
                String::from_utf8_lossy(other),
            ));
        }
    };
    cur.skip(60)?;

    let layout = cur.peek(4).map(|b| [b[0], b[1], b[2], b[3]]).unwrap_or_default();
    let endian = if matches!(i32::from_le_bytes(layout), 2 | 3) {
        Endian::Little
    } else if matches!(i32::from_be_bytes(layout), 2 | 3) {
        Endian::Big
    } else {
        return Err(StatError::invalid(FORMAT, "unrecognised layout code"));
    };
    cur.set_endian(endian);
    cur.skip(4)?;

    let _nominal_case_size = cur.i32()?;
    let compression = match cur.i32()? {
        0 => Compression::None,
        1 => Compression::Bytecode,
        2 if zlib_magic => Compression::Zlib,
        other => {
            return Err(StatError::invalid(
                FORMAT,
                format!("unknown compression code {other}"),
            ));
        }
    };
    let _weight_index = cur.i32()?;
    let ncases = usize::try_from(cur.i32()?).ok();
    let bias = cur.f64()?;
    cur.skip(9 + 8)?;
    let file_label = cur.take(64)?.to_vec();
    cur.skip(3)?;

    let mut dict = SavDictionary {
        endian,
        compression,
        bias,
        ncases,
        file_label,
        variables: Vec::new(),
        value_labels: Vec::new(),
        long_string_labels: Vec::new(),
        long_names: None,
        very_long_strings: None,
        encoding_name: None,
        character_code: None,
        sysmis: -f64::MAX,
        data_offset: 0,
    };

    loop {
        match cur.i32()? {
            2 => dict.variables.push(read_variable(&mut cur)?),
            3 => {
                let labels = read_value_labels(&mut cur)?;
                dict.value_labels.push(labels);
            }
            4 => {
                return Err(StatError::invalid(
                    FORMAT,
                    "value label variables without labels",
                ));
            }
            6 => {
                let lines = non_negative(cur.i32()?)?;
                cur.skip(lines * 80)?;
            }
            7 => read_extension(&mut cur, &mut dict)?,
            999 => {
                cur.skip(4)?;
                break;
            }
            other => {
                return Err(StatError::invalid(
                    FORMAT,
                    format!("unknown record type {other} at offset {}", cur.position() - 4),
                ));
            }
        }
    }
    dict.data_offset = cur.position();
    Ok(dict)
}

fn non_negative(value: i32) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| StatError::invalid(FORMAT, format!("negative count {value}")))
}

fn read_variable(cur: &mut ByteCursor<'_>) -> Result<RawVariable> {
    let width = cur.i32()?;
    let has_label = cur.i32()? != 0;
    let missing_kind = cur.i32()?;
    let print_format = cur.u32()?;
    let _write_format = cur.u32()?;
    let short_name = String::from_utf8_lossy(cur.take(8)?)
        .trim_end()
        .to_string();

    let label = if has_label {
        let len = non_negative(cur.i32()?)?;
        let bytes = cur.take(len)?.to_vec();
        cur.skip(len.next_multiple_of(4) - len)?;
        Some(bytes)
    } else {
        None
    };

    let count = missing_kind.unsigned_abs() as usize;
    let mut missing = Vec::with_capacity(count.min(cur.remaining() / 8));
    for _ in 0..count {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(cur.take(8)?);
        missing.push(raw);
    }

    Ok(RawVariable {
        width,
        short_name,
        label,
        print_format,
        missing_kind,
        missing,
    })
}

fn read_value_labels(cur: &mut ByteCursor<'_>) -> Result<RawValueLabels> {
    let count = non_negative(cur.i32()?)?;
    let mut labels = RawValueLabels::default();
    for _ in 0..count {
        let mut value = [0u8; 8];
        value.copy_from_slice(cur.take(8)?);
        let len = usize::from(cur.u8()?);
        let label = cur.take(len)?.to_vec();
        // Length byte plus label are padded to a multiple of 8.
        cur.skip((len + 1).next_multiple_of(8) - (len + 1))?;
        labels.entries.push((value, label));
    }

    if cur.i32()? != 4 {
        return Err(StatError::invalid(
            FORMAT,
            "value labels not followed by a variable index record",
        ));
    }
    let nvars = non_negative(cur.i32()?)?;
    for _ in 0..nvars {
        labels.variables.push(non_negative(cur.i32()?)?);
    }
    Ok(labels)
}

fn read_extension(cur: &mut ByteCursor<'_>, dict: &mut SavDictionary) -> Result<()> {
    let subtype = cur.i32()?;
    let size = non_negative(cur.i32()?)?;
    let count = non_negative(cur.i32()?)?;
    let len = size
        .checked_mul(count)
        .ok_or_else(|| StatError::invalid(FORMAT, "extension record too large"))?;
    let body = cur.take(len)?;
    let mut sub = ByteCursor::new(body, cur.endian());

    match subtype {
        3 if len >= 32 => {
            sub.skip(28)?;
            dict.character_code = Some(sub.i32()?);
        }
        4 if len >= 8 => dict.sysmis = sub.f64()?,
        13 => dict.long_names = Some(body.to_vec()),
        14 => dict.very_long_strings = Some(body.to_vec()),
        20 => dict.encoding_name = Some(String::from_utf8_lossy(body).trim().to_string()),
        21 => {
            while !sub.is_at_end() {
                let name_len = non_negative(sub.i32()?)?;
                let variable = sub.take(name_len)?.to_vec();
                let _width = sub.i32()?;
                let n_labels = non_negative(sub.i32()?)?;
                let mut entries = Vec::with_capacity(n_labels.min(sub.remaining() / 8));
                for _ in 0..n_labels {
                    let value_len = non_negative(sub.i32()?)?;
                    let value = sub.take(value_len)?.to_vec();
                    let label_len = non_negative(sub.i32()?)?;
                    let label = sub.take(label_len)?.to_vec();
                    entries.push((value, label));
                }
                dict.long_string_labels.push(LongStringLabels { variable, entries });
            }
        }
        _ => {}
    }
    Ok(())
}

/// Splits `KEY=value` pairs separated by `sep`, dropping NUL padding.
pub fn key_value_pairs(bytes: &[u8], sep: u8) -> Vec<(Vec<u8>, Vec<u8>)> {
    bytes
        .split(|b| *b == sep)
        .filter_map(|pair| {
            let pair: Vec<u8> = pair.iter().copied().filter(|b| *b != 0).collect();
            let eq = pair.iter().position(|b| *b == b'=')?;
            Some((pair[..eq].to_vec(), pair[eq + 1..].to_vec()))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_pairs() {
        let pairs = key_value_pairs(b"AGE=Age\tNAME=FullName", b'\t');
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], (b"NAME".to_vec(), b"FullName".to_vec()));

        let widths = key_value_pairs(b"NOTES=00300\0\t", b'\t');
        assert_eq!(widths, vec![(b"NOTES".to_vec(), b"00300".to_vec())]);
    }

    fn empty_dictionary() -> SavDictionary {
        SavDictionary {
            endian: Endian::Little,
            compression: Compression::None,
            bias: 100.0,
            ncases: None,
            file_label: Vec::new(),
            variables: Vec::new(),
            value_labels: Vec::new(),
            long_string_labels: Vec::new(),
            long_names: None,
            very_long_strings: None,
            encoding_name: None,
            character_code: None,
            sysmis: -f64::MAX,
            data_offset: 0,
        }
    }

    #[test]
    fn test_long_string_label_count_beyond_record() {
        let mut body = Vec::new();
        body.extend_from_slice(&4i32.to_le_bytes());
        body.extend_from_slice(b"NOTE");
        body.extend_from_slice(&300i32.to_le_bytes());
        body.extend_from_slice(&i32::MAX.to_le_bytes());
        let mut record = Vec::new();
        record.extend_from_slice(&21i32.to_le_bytes());
        record.extend_from_slice(&1i32.to_le_bytes());
        record.extend_from_slice(&(body.len() as i32).to_le_bytes());
        record.extend_from_slice(&body);

        let mut cur = ByteCursor::new(&record, Endian::Little);
        let mut dict = empty_dictionary();
        assert!(matches!(
            read_extension(&mut cur, &mut dict),
            Err(StatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_rejects_non_spss_magic() {
        let data = b"PK\x03\x04 not a system file";
        assert!(matches!(
            parse_dictionary(data),
            Err(StatError::UnsupportedVersion { .. })
        ));
    }
}
