//! Case data decompression into a flat slot buffer.

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::dictionary::{Compression, FORMAT, SavDictionary};
use crate::bytes::{ByteCursor, Endian};
use crate::error::{Result, StatError};

const SLOT: usize = 8;

/// Returns the case data as consecutive, uncompressed 8-byte slots.
pub fn case_slots(data: &[u8], dict: &SavDictionary) -> Result<Vec<u8>> {
    let body = data
        .get(dict.data_offset..)
        .ok_or_else(|| StatError::invalid(FORMAT, "data offset past end of file"))?;
    match dict.compression {
        Compression::None => Ok(body.to_vec()),
        Compression::Bytecode => Ok(decode_bytecode(body, dict)),
        Compression::Zlib => {
            let stream = inflate_blocks(data, dict)?;
            Ok(decode_bytecode(&stream, dict))
        }
    }
}

fn number_bytes(value: f64, endian: Endian) -> [u8; SLOT] {
    match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    }
}

/// Expands the bytecode scheme: blocks of 8 command bytes, each followed by
/// the raw slots its `253` commands refer to.
fn decode_bytecode(stream: &[u8], dict: &SavDictionary) -> Vec<u8> {
    let mut out = Vec::with_capacity(stream.len() * 2);
    let sysmis = number_bytes(dict.sysmis, dict.endian);
    let mut pos = 0;

    'blocks: while pos + SLOT <= stream.len() {
        let commands = &stream[pos..pos + SLOT];
        pos += SLOT;
        for &code in commands {
            match code {
                0 => {}
                1..=251 => out.extend_from_slice(&number_bytes(
                    f64::from(code) - dict.bias,
                    dict.endian,
                )),
                252 => break 'blocks,
                253 => {
                    let Some(raw) = stream.get(pos..pos + SLOT) else {
                        break 'blocks;
                    };
                    out.extend_from_slice(raw);
                    pos += SLOT;
                }
                254 => out.extend_from_slice(&[b' '; SLOT]),
                _ => out.extend_from_slice(&sysmis),
            }
        }
    }
    out
}

/// Inflates the zlib blocks listed in the ZSAV trailer.
fn inflate_blocks(data: &[u8], dict: &SavDictionary) -> Result<Vec<u8>> {
    let mut cur = ByteCursor::new(data, dict.endian);
    cur.seek(dict.data_offset)?;
    let _zheader_offset = cur.i64()?;
    let trailer_offset = offset(cur.i64()?)?;
    let _trailer_len = cur.i64()?;

    cur.seek(trailer_offset)?;
    let _bias = cur.i64()?;
    let _zero = cur.i64()?;
    let _block_size = cur.i32()?;
    let n_blocks = usize::try_from(cur.i32()?)
        .map_err(|_| StatError::invalid(FORMAT, "negative zlib block count"))?;

    let mut out = Vec::new();
    for _ in 0..n_blocks {
        let _uncompressed_offset = cur.i64()?;
        let compressed_offset = offset(cur.i64()?)?;
        let uncompressed_size = offset(i64::from(cur.i32()?))?;
        let compressed_size = offset(i64::from(cur.i32()?))?;

        let block = data
            .get(compressed_offset..compressed_offset + compressed_size)
            .ok_or_else(|| StatError::invalid(FORMAT, "zlib block outside file"))?;
        let start = out.len();
        ZlibDecoder::new(block).read_to_end(&mut out)?;
        if out.len() - start != uncompressed_size {
            return Err(StatError::invalid(
                FORMAT,
                format!(
                    "zlib block inflated to {} bytes, expected {uncompressed_size}",
                    out.len() - start
                ),
            ));
        }
    }
    Ok(out)
}

fn offset(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| StatError::invalid(FORMAT, format!("bad offset {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sav::dictionary::Compression;

    fn dict(compression: Compression) -> SavDictionary {
        SavDictionary {
            endian: Endian::Little,
            compression,
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
    fn test_bytecode_expansion() {
        let mut stream = vec![101, 253, 254, 255, 0, 0, 0, 252];
        stream.extend_from_slice(b"RAWBYTES");
        let out = decode_bytecode(&stream, &dict(Compression::Bytecode));

        assert_eq!(out.len(), 4 * SLOT);
        assert_eq!(f64::from_le_bytes(out[0..8].try_into().unwrap()), 1.0);
        assert_eq!(&out[8..16], b"RAWBYTES");
        assert_eq!(&out[16..24], b"        ");
        assert_eq!(f64::from_le_bytes(out[24..32].try_into().unwrap()), -f64::MAX);
    }

    #[test]
    fn test_bytecode_stops_on_truncated_raw_slot() {
        let stream = vec![253, 0, 0, 0, 0, 0, 0, 0, b'x'];
        assert!(decode_bytecode(&stream, &dict(Compression::Bytecode)).is_empty());
    }
}
