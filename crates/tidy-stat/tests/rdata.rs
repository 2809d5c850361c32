use std::fs;
use std::io::Write;
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use tidy_model::ValueCode;
use tidy_stat::{ColumnValues, StatError, read_r};

const LISTSXP: u32 = 2;
const SYMSXP: u32 = 1;
const CHARSXP: u32 = 9;
const INTSXP: u32 = 13;
const REALSXP: u32 = 14;
const STRSXP: u32 = 16;
const VECSXP: u32 = 19;
const NILVALUE: u32 = 254;
const REFSXP: u32 = 255;
const IS_OBJECT: u32 = 1 << 8;
const HAS_ATTR: u32 = 1 << 9;
const HAS_TAG: u32 = 1 << 10;
const NA_INT: i32 = i32::MIN;

/// XDR stream writer that emits back-references for repeated symbols.
#[derive(Default)]
struct Xdr {
    out: Vec<u8>,
    symbols: Vec<String>,
}

impl Xdr {
    fn rds() -> Self {
        let mut xdr = Self::default();
        xdr.out.extend_from_slice(b"X\n");
        xdr.int(2);
        xdr.int(0x0004_0201);
        xdr.int(0x0002_0300);
        xdr
    }

    fn int(&mut self, value: i32) {
        self.out.extend_from_slice(&value.to_be_bytes());
    }

    fn flags(&mut self, value: u32) {
        self.out.extend_from_slice(&value.to_be_bytes());
    }

    fn chars(&mut self, text: Option<&str>) {
        self.flags(CHARSXP | (64 << 12));
        match text {
            Some(text) => {
                self.int(text.len() as i32);
                self.out.extend_from_slice(text.as_bytes());
            }
            None => self.int(-1),
        }
    }

    fn symbol(&mut self, name: &str) {
        if let Some(pos) = self.symbols.iter().position(|s| s == name) {
            self.flags(REFSXP | (((pos + 1) as u32) << 8));
            return;
        }
        self.symbols.push(name.to_string());
        self.flags(SYMSXP);
        self.chars(Some(name));
    }

    fn strings(&mut self, values: &[Option<&str>]) {
        self.flags(STRSXP);
        self.int(values.len() as i32);
        for value in values {
            self.chars(*value);
        }
    }

    fn ints(&mut self, flags: u32, values: &[i32]) {
        self.flags(INTSXP | flags);
        self.int(values.len() as i32);
        for value in values {
            self.int(*value);
        }
    }

    fn reals(&mut self, flags: u32, values: &[f64]) {
        self.flags(REALSXP | flags);
        self.int(values.len() as i32);
        for value in values {
            self.out.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn nil(&mut self) {
        self.flags(NILVALUE);
    }

    /// Tagged cons cell; the caller writes the car next.
    fn cell(&mut self, tag: &str) {
        self.flags(LISTSXP | HAS_TAG);
        self.symbol(tag);
    }

    /// `data.frame(id = c(1L, 2L, NA), grp = c("b", "a", NA), score = ...)`
    /// where `score` carries `label` and `labels` attributes.
    fn data_frame(&mut self) {
        self.flags(VECSXP | IS_OBJECT | HAS_ATTR);
        self.int(3);
        self.ints(0, &[1, 2, NA_INT]);
        self.strings(&[Some("b"), Some("a"), None]);

        self.reals(HAS_ATTR, &[1.0, 2.0, 1.0]);
        self.cell("label");
        self.strings(&[Some("Score band")]);
        self.cell("labels");
        self.reals(HAS_ATTR, &[1.0, 2.0]);
        self.cell("names");
        self.strings(&[Some("Low"), Some("High")]);
        self.nil();
        self.nil();

        self.cell("names");
        self.strings(&[Some("id"), Some("grp"), Some("score")]);
        self.cell("class");
        self.strings(&[Some("data.frame")]);
        self.cell("row.names");
        self.ints(0, &[NA_INT, -3]);
        self.nil();
    }
}

fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write fixture");
    path
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("compress");
    encoder.finish().expect("finish")
}

fn archive() -> Vec<u8> {
    let mut xdr = Xdr::default();
    xdr.out.extend_from_slice(b"RDX2\n");
    let header = Xdr::rds().out;
    xdr.out.extend_from_slice(&header);
    xdr.cell("counts");
    xdr.ints(0, &[4, 5]);
    xdr.cell("survey");
    xdr.data_frame();
    xdr.nil();
    xdr.out
}

#[test]
fn reads_rds_data_frame() {
    let dir = TempDir::new().expect("tempdir");
    let mut xdr = Xdr::rds();
    xdr.data_frame();
    let path = write(&dir, "survey.rds", &xdr.out);

    let dataset = read_r(&path, None).expect("read rds");
    assert_eq!(
        dataset.column_names().collect::<Vec<_>>(),
        vec!["id", "grp", "score"]
    );
    assert_eq!(
        dataset.columns[0].values,
        ColumnValues::Int(vec![Some(1), Some(2), None])
    );
    assert_eq!(
        dataset.columns[1].values,
        ColumnValues::Factor {
            codes: vec![Some(1), Some(0), None],
            levels: vec!["a".to_string(), "b".to_string()],
        }
    );
    let score = &dataset.columns[2];
    assert_eq!(score.label.as_deref(), Some("Score band"));
    assert_eq!(
        score.value_labels.get(&ValueCode::Int(2)).map(String::as_str),
        Some("High")
    );
}

#[test]
fn reads_gzipped_archive_by_name() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.RData", &gzip(&archive()));
    let dataset = read_r(&path, Some("survey")).expect("read archive");
    assert_eq!(dataset.num_rows(), 3);
}

#[test]
fn picks_first_data_frame_without_name() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.rda", &archive());
    let dataset = read_r(&path, None).expect("read archive");
    assert_eq!(dataset.columns.len(), 3);
}

#[test]
fn rds_extension_holding_an_archive() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "saved.rds", &gzip(&archive()));
    let dataset = read_r(&path, None).expect("read archive");
    assert_eq!(dataset.columns[0].name, "id");
}

#[test]
fn named_object_must_exist() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.rda", &archive());
    let err = read_r(&path, Some("missing")).expect_err("absent object");
    match err {
        StatError::ObjectNotFound { name, available } => {
            assert_eq!(name, "missing");
            assert_eq!(available, vec!["counts".to_string(), "survey".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_frame_object_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.rda", &archive());
    let err = read_r(&path, Some("counts")).expect_err("vector object");
    assert!(matches!(err, StatError::NotADataFrame { .. }));

    let mut xdr = Xdr::rds();
    xdr.ints(0, &[1, 2, 3]);
    let path = write(&dir, "vector.rds", &xdr.out);
    assert!(matches!(
        read_r(&path, None),
        Err(StatError::NotADataFrame { .. })
    ));
}

#[test]
fn empty_archive_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let mut bytes = b"RDX2\n".to_vec();
    let mut xdr = Xdr::rds();
    xdr.nil();
    bytes.extend(xdr.out);
    let path = write(&dir, "empty.RData", &bytes);
    assert!(matches!(
        read_r(&path, None),
        Err(StatError::EmptyArchive { .. })
    ));
}
