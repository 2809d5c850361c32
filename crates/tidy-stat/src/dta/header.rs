//! Stata header and descriptor parsing.
//!
//! Two layouts are supported:
//!
//! | Releases | Layout |
//! |----------|--------|
//! | 113–115  | fixed binary header, value labels after the data |
//! | 117–119  | tagged sections (`<stata_dta>…`) with an offset map |
//!
//! Field widths grow with the release:
//!
//! | Field            | 113 | 114/115 | 117 | 118/119 |
//! |------------------|-----|---------|-----|---------|
//! | variable name    | 33  | 33      | 33  | 129     |
//! | format           | 12  | 49      | 49  | 57      |
//! | value label name | 33  | 33      | 33  | 129     |
//! | variable label   | 81  | 81      | 81  | 321     |

use encoding_rs::WINDOWS_1252;

use crate::bytes::{ByteCursor, Endian, until_nul};
use crate::error::{Result, StatError};

pub(crate) const FORMAT: &str = "Stata";

/// Storage type of a Stata variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtaType {
    /// Fixed-width string of the given byte length.
    Str(usize),
    /// Long string stored in the strL section (117+).
    StrL,
    Byte,
    Int,
    Long,
    Float,
    Double,
}

impl DtaType {
    /// Bytes occupied in an observation.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::Str(len) => len,
            Self::StrL => 8,
            Self::Byte => 1,
            Self::Int => 2,
            Self::Long | Self::Float => 4,
            Self::Double => 8,
        }
    }

    fn from_legacy(code: u8) -> Option<Self> {
        match code {
            1..=244 => Some(Self::Str(usize::from(code))),
            251 => Some(Self::Byte),
            252 => Some(Self::Int),
            253 => Some(Self::Long),
            254 => Some(Self::Float),
            255 => Some(Self::Double),
            _ => None,
        }
    }

    fn from_tagged(code: u16) -> Option<Self> {
        match code {
            1..=2045 => Some(Self::Str(usize::from(code))),
            32768 => Some(Self::StrL),
            65526 => Some(Self::Double),
            65527 => Some(Self::Float),
            65528 => Some(Self::Long),
            65529 => Some(Self::Int),
            65530 => Some(Self::Byte),
            _ => None,
        }
    }
}

/// Parsed descriptors of a Stata file.
#[derive(Debug, Clone)]
pub struct DtaHeader {
    pub release: u16,
    pub endian: Endian,
    pub nobs: usize,
    pub data_label: Option<String>,
    pub types: Vec<DtaType>,
    pub names: Vec<String>,
    pub formats: Vec<String>,
    pub value_label_names: Vec<String>,
    pub variable_labels: Vec<String>,
    /// Offset of the first observation byte.
    pub data_offset: usize,
    /// Offset of the `<strls>` tag (tagged layout only).
    pub strls_offset: Option<usize>,
    /// Offset of the value label section; `None` means "right after the data".
    pub value_labels_offset: Option<usize>,
}

impl DtaHeader {
    /// Bytes per observation.
    #[must_use]
    pub fn row_width(&self) -> usize {
        self.types.iter().map(|t| t.width()).sum()
    }

    /// True for releases that store text as UTF-8.
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        self.release >= 118
    }

    /// Decodes a fixed-width, NUL-padded text field.
    #[must_use]
    pub fn decode_text(&self, bytes: &[u8]) -> String {
        decode_text(until_nul(bytes), self.is_utf8())
    }

    /// Width of a value label table name.
    pub(crate) fn label_name_width(&self) -> usize {
        if self.release >= 118 { 129 } else { 33 }
    }
}

pub(crate) fn decode_text(bytes: &[u8], utf8: bool) -> String {
    if utf8 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        let (text, _, _) = WINDOWS_1252.decode(bytes);
        text.into_owned()
    }
}

/// Parses the header of either layout.
pub fn parse_header(data: &[u8]) -> Result<DtaHeader> {
    if data.starts_with(b"<stata_dta>") {
        parse_tagged_header(data)
    } else {
        parse_legacy_header(data)
    }
}

fn parse_legacy_header(data: &[u8]) -> Result<DtaHeader> {
    let mut cur = ByteCursor::new(data, Endian::Little);
    let release = u16::from(cur.u8()?);
    if !(113..=115).contains(&release) {
        return Err(StatError::unsupported_version(FORMAT, release));
    }
    let endian = match cur.u8()? {
        1 => Endian::Big,
        2 => Endian::Little,
        other => {
            return Err(StatError::invalid(
                FORMAT,
                format!("unknown byte order flag {other}"),
            ));
        }
    };
    cur.set_endian(endian);
    let _filetype = cur.u8()?;
    let _unused = cur.u8()?;
    let nvar = usize::from(cur.u16()?);
    let nobs = cur.u32()? as usize;

    let utf8 = false;
    let data_label = text_field(cur.take(81)?, utf8);
    cur.skip(18)?;

    let mut types = Vec::with_capacity(nvar);
    for (idx, code) in cur.take(nvar)?.iter().enumerate() {
        let ty = DtaType::from_legacy(*code).ok_or_else(|| {
            StatError::invalid(FORMAT, format!("variable {idx} has unknown type {code}"))
        })?;
        types.push(ty);
    }
    let names = fixed_fields(&mut cur, nvar, 33, utf8)?;
    cur.skip(2 * (nvar + 1))?;
    let format_width = if release == 113 { 12 } else { 49 };
    let formats = fixed_fields(&mut cur, nvar, format_width, utf8)?;
    let value_label_names = fixed_fields(&mut cur, nvar, 33, utf8)?;
    let variable_labels = fixed_fields(&mut cur, nvar, 81, utf8)?;

    // Expansion fields, terminated by a zero type with zero length.
    loop {
        let kind = cur.u8()?;
        let len = cur.u32()? as usize;
        if kind == 0 && len == 0 {
            break;
        }
        cur.skip(len)?;
    }

    Ok(DtaHeader {
        release,
        endian,
        nobs,
        data_label,
        types,
        names,
        formats,
        value_label_names,
        variable_labels,
        data_offset: cur.position(),
        strls_offset: None,
        value_labels_offset: None,
    })
}

fn parse_tagged_header(data: &[u8]) -> Result<DtaHeader> {
    let mut cur = ByteCursor::new(data, Endian::Little);
    cur.expect(FORMAT, b"<stata_dta><header><release>")?;
    let release_text = String::from_utf8_lossy(cur.take(3)?).into_owned();
    let release: u16 = release_text
        .parse()
        .map_err(|_| StatError::invalid(FORMAT, format!("bad release {release_text:?}")))?;
    if !(117..=119).contains(&release) {
        return Err(StatError::unsupported_version(FORMAT, release));
    }
    cur.expect(FORMAT, b"</release><byteorder>")?;
    let endian = match cur.take(3)? {
        b"MSF" => Endian::Big,
        b"LSF" => Endian::Little,
        other => {
            return Err(StatError::invalid(
                FORMAT,
                format!("unknown byte order {:?}", String::from_utf8_lossy(other)),
            ));
        }
    };
    cur.set_endian(endian);
    cur.expect(FORMAT, b"</byteorder><K>")?;
    let nvar = if release == 119 {
        cur.u32()? as usize
    } else {
        usize::from(cur.u16()?)
    };
    cur.expect(FORMAT, b"</K><N>")?;
    let nobs = if release == 117 {
        cur.u32()? as usize
    } else {
        usize::try_from(cur.u64()?)
            .map_err(|_| StatError::invalid(FORMAT, "observation count overflows"))?
    };
    cur.expect(FORMAT, b"</N><label>")?;
    let label_len = if release == 117 {
        usize::from(cur.u8()?)
    } else {
        usize::from(cur.u16()?)
    };
    let utf8 = release >= 118;
    let data_label = text_field(cur.take(label_len)?, utf8);
    cur.expect(FORMAT, b"</label><timestamp>")?;
    let stamp_len = usize::from(cur.u8()?);
    cur.skip(stamp_len)?;
    cur.expect(FORMAT, b"</timestamp></header>")?;

    cur.expect(FORMAT, b"<map>")?;
    let mut map = [0usize; 14];
    for slot in &mut map {
        *slot = usize::try_from(cur.u64()?)
            .map_err(|_| StatError::invalid(FORMAT, "section offset overflows"))?;
    }
    cur.expect(FORMAT, b"</map>")?;

    cur.expect(FORMAT, b"<variable_types>")?;
    let mut types = Vec::with_capacity(nvar.min(cur.remaining() / 2));
    for idx in 0..nvar {
        let code = cur.u16()?;
        let ty = DtaType::from_tagged(code).ok_or_else(|| {
            StatError::invalid(FORMAT, format!("variable {idx} has unknown type {code}"))
        })?;
        types.push(ty);
    }
    cur.expect(FORMAT, b"</variable_types>")?;

    let wide = release >= 118;
    cur.expect(FORMAT, b"<varnames>")?;
    let names = fixed_fields(&mut cur, nvar, if wide { 129 } else { 33 }, utf8)?;
    cur.expect(FORMAT, b"</varnames>")?;

    cur.expect(FORMAT, b"<sortlist>")?;
    cur.skip((nvar + 1) * if release == 119 { 4 } else { 2 })?;
    cur.expect(FORMAT, b"</sortlist>")?;

    cur.expect(FORMAT, b"<formats>")?;
    let formats = fixed_fields(&mut cur, nvar, if wide { 57 } else { 49 }, utf8)?;
    cur.expect(FORMAT, b"</formats>")?;

    cur.expect(FORMAT, b"<value_label_names>")?;
    let value_label_names = fixed_fields(&mut cur, nvar, if wide { 129 } else { 33 }, utf8)?;
    cur.expect(FORMAT, b"</value_label_names>")?;

    cur.expect(FORMAT, b"<variable_labels>")?;
    let variable_labels = fixed_fields(&mut cur, nvar, if wide { 321 } else { 81 }, utf8)?;
    cur.expect(FORMAT, b"</variable_labels>")?;

    // map[9] = <data>, map[10] = <strls>, map[11] = <value_labels>
    cur.seek(map[9])?;
    cur.expect(FORMAT, b"<data>")?;

    Ok(DtaHeader {
        release,
        endian,
        nobs,
        data_label,
        types,
        names,
        formats,
        value_label_names,
        variable_labels,
        data_offset: cur.position(),
        strls_offset: Some(map[10]),
        value_labels_offset: Some(map[11]),
    })
}

fn fixed_fields(
    cur: &mut ByteCursor<'_>,
    count: usize,
    width: usize,
    utf8: bool,
) -> Result<Vec<String>> {
    (0..count)
        .map(|_| Ok(decode_text(until_nul(cur.take(width)?), utf8)))
        .collect()
}

fn text_field(bytes: &[u8], utf8: bool) -> Option<String> {
    let text = decode_text(until_nul(bytes), utf8);
    if text.trim().is_empty() { None } else { Some(text) }
}
