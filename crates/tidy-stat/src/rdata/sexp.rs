//! Decoder for R's serialization format (versions 2 and 3).
//!
//! Only the object types that can appear inside saved data are decoded
//! into values; closures, environments and other language objects are
//! consumed and kept as opaque placeholders so that references to them
//! stay resolvable.

use encoding_rs::WINDOWS_1252;

use crate::bytes::{ByteCursor, Endian};
use crate::error::{Result, StatError};

pub(crate) const FORMAT: &str = "R";

const NILSXP: u8 = 0;
const SYMSXP: u8 = 1;
const LISTSXP: u8 = 2;
const CLOSXP: u8 = 3;
const ENVSXP: u8 = 4;
const PROMSXP: u8 = 5;
const LANGSXP: u8 = 6;
const SPECIALSXP: u8 = 7;
const BUILTINSXP: u8 = 8;
const CHARSXP: u8 = 9;
const LGLSXP: u8 = 10;
const INTSXP: u8 = 13;
const REALSXP: u8 = 14;
const CPLXSXP: u8 = 15;
const STRSXP: u8 = 16;
const DOTSXP: u8 = 17;
const VECSXP: u8 = 19;
const EXPRSXP: u8 = 20;
const BCODESXP: u8 = 21;
const EXTPTRSXP: u8 = 22;
const WEAKREFSXP: u8 = 23;
const RAWSXP: u8 = 24;
const S4SXP: u8 = 25;
const ALTREP_SXP: u8 = 238;
const ATTRLANGSXP: u8 = 239;
const ATTRLISTSXP: u8 = 240;
const BASEENV_SXP: u8 = 241;
const EMPTYENV_SXP: u8 = 242;
const GLOBALENV_SXP: u8 = 253;
const PERSISTSXP: u8 = 247;
const PACKAGESXP: u8 = 248;
const NAMESPACESXP: u8 = 249;
const BASENAMESPACE_SXP: u8 = 250;
const MISSINGARG_SXP: u8 = 251;
const UNBOUNDVALUE_SXP: u8 = 252;
const NILVALUE_SXP: u8 = 254;
const REFSXP: u8 = 255;

const HAS_ATTR: u32 = 1 << 9;
const HAS_TAG: u32 = 1 << 10;
const LATIN1_MASK: u32 = 1 << 2;

/// Longest compact sequence that is expanded in memory.
const MAX_COMPACT_LEN: usize = 1 << 27;

/// Payload of a decoded object.
#[derive(Debug, Clone, PartialEq)]
pub enum RKind {
    Null,
    Symbol(String),
    /// A single CHARSXP; `None` is `NA_character_`.
    Char(Option<String>),
    /// Tagged cons cells, flattened.
    Pairlist(Vec<(Option<String>, RObject)>),
    Logical(Vec<Option<bool>>),
    Integer(Vec<Option<i32>>),
    /// `NA_real_` and `NaN` are both kept as NaN.
    Real(Vec<f64>),
    Complex(usize),
    Character(Vec<Option<String>>),
    List(Vec<RObject>),
    Raw(Vec<u8>),
    /// Environments and language objects.
    Opaque(&'static str),
}

/// A decoded object with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct RObject {
    pub kind: RKind,
    pub attributes: Vec<(String, RObject)>,
}

impl RObject {
    pub fn new(kind: RKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&RObject> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// The character vector stored in attribute `name`.
    pub fn string_attr(&self, name: &str) -> Option<Vec<Option<String>>> {
        match &self.attr(name)?.kind {
            RKind::Character(values) => Some(values.clone()),
            RKind::Char(value) => Some(vec![value.clone()]),
            _ => None,
        }
    }

    /// True when the `class` attribute contains `class`.
    pub fn inherits(&self, class: &str) -> bool {
        self.string_attr("class")
            .is_some_and(|classes| classes.iter().flatten().any(|c| c == class))
    }

    /// Vector length for vector kinds.
    pub fn len(&self) -> usize {
        match &self.kind {
            RKind::Logical(v) => v.len(),
            RKind::Integer(v) => v.len(),
            RKind::Real(v) => v.len(),
            RKind::Complex(n) => *n,
            RKind::Character(v) => v.len(),
            RKind::List(v) => v.len(),
            RKind::Raw(v) => v.len(),
            RKind::Pairlist(v) => v.len(),
            RKind::Char(_) | RKind::Symbol(_) => 1,
            RKind::Null | RKind::Opaque(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialization stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub version: i32,
    pub endian: Endian,
}

/// Decodes one serialized object from `data`.
pub fn unserialize(data: &[u8]) -> Result<(StreamHeader, RObject)> {
    let endian = match data.get(..2) {
        Some(b"X\n") => Endian::Big,
        Some(b"B\n") => Endian::Little,
        Some(b"A\n") => {
            return Err(StatError::unsupported_version(FORMAT, "ASCII serialization"));
        }
        _ => return Err(StatError::invalid(FORMAT, "unknown serialization format")),
    };
    let mut cur = ByteCursor::new(data, endian);
    cur.skip(2)?;
    let version = cur.i32()?;
    let _writer = cur.i32()?;
    let _min_reader = cur.i32()?;
    match version {
        2 => {}
        3 => {
            let len = length(cur.i32()?)?;
            cur.skip(len)?;
        }
        other => return Err(StatError::unsupported_version(FORMAT, other)),
    }

    let mut parser = Parser {
        cur,
        refs: Vec::new(),
    };
    let object = parser.read_item()?;
    Ok((StreamHeader { version, endian }, object))
}

fn length(value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| StatError::invalid(FORMAT, format!("bad length {value}")))
}

struct Parser<'a> {
    cur: ByteCursor<'a>,
    refs: Vec<RObject>,
}

impl Parser<'_> {
    fn read_item(&mut self) -> Result<RObject> {
        let flags = self.cur.u32()?;
        self.read_with_flags(flags)
    }

    fn read_with_flags(&mut self, flags: u32) -> Result<RObject> {
        let ty = (flags & 0xff) as u8;
        let has_attr = flags & HAS_ATTR != 0;

        let kind = match ty {
            NILSXP | NILVALUE_SXP | MISSINGARG_SXP | UNBOUNDVALUE_SXP => {
                return Ok(RObject::new(RKind::Null));
            }
            EMPTYENV_SXP | BASEENV_SXP | GLOBALENV_SXP | BASENAMESPACE_SXP => {
                return Ok(RObject::new(RKind::Opaque("environment")));
            }
            REFSXP => {
                let packed = (flags >> 8) as usize;
                let index = if packed == 0 {
                    length(self.cur.i32()?)?
                } else {
                    packed
                };
                return index
                    .checked_sub(1)
                    .and_then(|i| self.refs.get(i))
                    .cloned()
                    .ok_or_else(|| StatError::invalid(FORMAT, format!("dangling reference {index}")));
            }
            PERSISTSXP | PACKAGESXP | NAMESPACESXP => {
                self.read_persistent_strings()?;
                let object = RObject::new(RKind::Opaque("namespace"));
                self.refs.push(object.clone());
                return Ok(object);
            }
            SYMSXP => {
                let name = match self.read_item()?.kind {
                    RKind::Char(Some(name)) => name,
                    _ => String::new(),
                };
                let object = RObject::new(RKind::Symbol(name));
                self.refs.push(object.clone());
                return Ok(object);
            }
            ENVSXP => {
                let _locked = self.cur.i32()?;
                self.refs.push(RObject::new(RKind::Opaque("environment")));
                let _enclos = self.read_item()?;
                let _frame = self.read_item()?;
                let _hashtab = self.read_item()?;
                let _attrib = self.read_item()?;
                return Ok(RObject::new(RKind::Opaque("environment")));
            }
            LISTSXP | LANGSXP | CLOSXP | PROMSXP | DOTSXP | ATTRLANGSXP | ATTRLISTSXP => {
                return self.read_pairlist(flags);
            }
            EXTPTRSXP => {
                self.refs.push(RObject::new(RKind::Opaque("external pointer")));
                let _prot = self.read_item()?;
                let _tag = self.read_item()?;
                RKind::Opaque("external pointer")
            }
            WEAKREFSXP => {
                self.refs.push(RObject::new(RKind::Opaque("weak reference")));
                RKind::Opaque("weak reference")
            }
            SPECIALSXP | BUILTINSXP => {
                let len = length(self.cur.i32()?)?;
                self.cur.skip(len)?;
                RKind::Opaque("builtin")
            }
            CHARSXP => return self.read_char(flags).map(|c| RObject::new(RKind::Char(c))),
            LGLSXP => {
                let len = self.vector_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(match self.cur.i32()? {
                        i32::MIN => None,
                        v => Some(v != 0),
                    });
                }
                RKind::Logical(values)
            }
            INTSXP => {
                let len = self.vector_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let v = self.cur.i32()?;
                    values.push((v != i32::MIN).then_some(v));
                }
                RKind::Integer(values)
            }
            REALSXP => {
                let len = self.vector_length(8)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(self.cur.f64()?);
                }
                RKind::Real(values)
            }
            CPLXSXP => {
                let len = self.vector_length(16)?;
                self.cur.skip(len * 16)?;
                RKind::Complex(len)
            }
            STRSXP => {
                let len = self.vector_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let flags = self.cur.u32()?;
                    values.push(self.read_char(flags)?);
                }
                RKind::Character(values)
            }
            VECSXP | EXPRSXP => {
                let len = self.vector_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(self.read_item()?);
                }
                RKind::List(values)
            }
            RAWSXP => {
                let len = self.vector_length(1)?;
                RKind::Raw(self.cur.take(len)?.to_vec())
            }
            S4SXP => RKind::Opaque("S4 object"),
            ALTREP_SXP => return self.read_altrep(),
            BCODESXP => {
                return Err(StatError::invalid(FORMAT, "byte-code objects are not supported"));
            }
            other => {
                return Err(StatError::invalid(
                    FORMAT,
                    format!("unknown object type {other} at offset {}", self.cur.position() - 4),
                ));
            }
        };

        let mut object = RObject::new(kind);
        if has_attr {
            object.attributes = self.read_attributes()?;
        }
        Ok(object)
    }

    /// Reads a vector length and checks that `len` elements of at least
    /// `element_bytes` each fit in the rest of the stream.
    fn vector_length(&mut self, element_bytes: usize) -> Result<usize> {
        let len = match self.cur.i32()? {
            -1 => {
                let upper = u64::from(self.cur.u32()?);
                let lower = u64::from(self.cur.u32()?);
                usize::try_from((upper << 32) | lower)
                    .map_err(|_| StatError::invalid(FORMAT, "vector too long"))?
            }
            len => length(len)?,
        };
        match len.checked_mul(element_bytes) {
            Some(bytes) if bytes <= self.cur.remaining() => Ok(len),
            _ => Err(StatError::invalid(
                FORMAT,
                format!(
                    "vector of {len} elements at offset {} exceeds the remaining {} bytes",
                    self.cur.position(),
                    self.cur.remaining()
                ),
            )),
        }
    }

    fn read_char(&mut self, flags: u32) -> Result<Option<String>> {
        if (flags & 0xff) as u8 != CHARSXP {
            return Err(StatError::invalid(FORMAT, "expected a string element"));
        }
        let len = self.cur.i32()?;
        if len == -1 {
            return Ok(None);
        }
        let bytes = self.cur.take(length(len)?)?;
        let levels = flags >> 12;
        let text = if levels & LATIN1_MASK != 0 {
            WINDOWS_1252.decode(bytes).0.into_owned()
        } else {
            String::from_utf8_lossy(bytes).into_owned()
        };
        Ok(Some(text))
    }

    fn read_persistent_strings(&mut self) -> Result<Vec<Option<String>>> {
        let _zero = self.cur.i32()?;
        let len = length(self.cur.i32()?)?;
        if len.saturating_mul(4) > self.cur.remaining() {
            return Err(StatError::invalid(FORMAT, "string table longer than the file"));
        }
        (0..len)
            .map(|_| {
                let flags = self.cur.u32()?;
                self.read_char(flags)
            })
            .collect()
    }

    /// Reads a cons-cell chain iteratively; `flags` belongs to the first cell.
    fn read_pairlist(&mut self, mut flags: u32) -> Result<RObject> {
        let first_type = (flags & 0xff) as u8;
        let mut items = Vec::new();
        let mut attributes = Vec::new();
        loop {
            if flags & HAS_ATTR != 0 {
                let attrs = self.read_attributes()?;
                if items.is_empty() {
                    attributes = attrs;
                }
            }
            let tag = if flags & HAS_TAG != 0 {
                match self.read_item()?.kind {
                    RKind::Symbol(name) => Some(name),
                    RKind::Char(name) => name,
                    _ => None,
                }
            } else {
                None
            };
            let car = self.read_item()?;
            items.push((tag, car));

            let next = self.cur.u32()?;
            if (next & 0xff) as u8 == LISTSXP {
                flags = next;
                continue;
            }
            let _tail = self.read_with_flags(next)?;
            break;
        }

        let kind = match first_type {
            LISTSXP | ATTRLISTSXP | DOTSXP => RKind::Pairlist(items),
            CLOSXP => RKind::Opaque("closure"),
            PROMSXP => RKind::Opaque("promise"),
            _ => RKind::Opaque("language"),
        };
        Ok(RObject { kind, attributes })
    }

    fn read_attributes(&mut self) -> Result<Vec<(String, RObject)>> {
        match self.read_item()?.kind {
            RKind::Pairlist(items) => Ok(items
                .into_iter()
                .filter_map(|(tag, value)| tag.map(|tag| (tag, value)))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn read_altrep(&mut self) -> Result<RObject> {
        let info = self.read_item()?;
        let state = self.read_item()?;
        let attributes = match self.read_item()?.kind {
            RKind::Pairlist(items) => items
                .into_iter()
                .filter_map(|(tag, value)| tag.map(|tag| (tag, value)))
                .collect(),
            _ => Vec::new(),
        };

        let class = match &info.kind {
            RKind::Pairlist(items) => match items.first().map(|(_, v)| &v.kind) {
                Some(RKind::Symbol(name)) => name.clone(),
                _ => String::new(),
            },
            _ => String::new(),
        };

        let kind = match class.as_str() {
            "compact_intseq" => {
                let (n, start, step) = sequence_state(&state)?;
                let last = start + step * n.saturating_sub(1) as f64;
                let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
                if !range.contains(&start) || !range.contains(&last) {
                    return Err(StatError::invalid(FORMAT, "integer sequence overflows"));
                }
                RKind::Integer(
                    (0..n)
                        .map(|i| Some((start + step * i as f64) as i32))
                        .collect(),
                )
            }
            "compact_realseq" => {
                let (n, start, step) = sequence_state(&state)?;
                RKind::Real((0..n).map(|i| start + step * i as f64).collect())
            }
            "deferred_string" => {
                let source = first_element(state);
                RKind::Character(match source.kind {
                    RKind::Integer(values) => values
                        .into_iter()
                        .map(|v| v.map(|v| v.to_string()))
                        .collect(),
                    RKind::Real(values) => values
                        .into_iter()
                        .map(|v| (!v.is_nan()).then(|| format_real(v)))
                        .collect(),
                    RKind::Character(values) => values,
                    _ => {
                        return Err(StatError::invalid(
                            FORMAT,
                            "deferred string without a numeric source",
                        ));
                    }
                })
            }
            name if name.starts_with("wrap_") => first_element(state).kind,
            other => {
                return Err(StatError::invalid(
                    FORMAT,
                    format!("unsupported ALTREP class {other:?}"),
                ));
            }
        };
        Ok(RObject { kind, attributes })
    }
}

fn sequence_state(state: &RObject) -> Result<(usize, f64, f64)> {
    let (n, start, step) = match &state.kind {
        RKind::Real(v) if v.len() == 3 => (v[0], v[1], v[2]),
        RKind::Integer(v) if v.len() == 3 => {
            let get = |i: usize| f64::from(v[i].unwrap_or(0));
            (get(0), get(1), get(2))
        }
        _ => return Err(StatError::invalid(FORMAT, "malformed compact sequence")),
    };
    if !n.is_finite() || n < 0.0 || n > MAX_COMPACT_LEN as f64 {
        return Err(StatError::invalid(
            FORMAT,
            format!("compact sequence length {n} out of range"),
        ));
    }
    if !start.is_finite() || !step.is_finite() {
        return Err(StatError::invalid(FORMAT, "malformed compact sequence"));
    }
    Ok((n as usize, start, step))
}

fn first_element(state: RObject) -> RObject {
    match state.kind {
        RKind::Pairlist(items) => items
            .into_iter()
            .next()
            .map_or_else(|| RObject::new(RKind::Null), |(_, v)| v),
        RKind::List(items) => items
            .into_iter()
            .next()
            .unwrap_or_else(|| RObject::new(RKind::Null)),
        _ => state,
    }
}

/// Formats a double the way `as.character` does for common values.
pub(crate) fn format_real(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
