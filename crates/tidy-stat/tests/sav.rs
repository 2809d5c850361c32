use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tidy_model::ValueCode;
use tidy_stat::{ColumnValues, SavOptions, StatError, read_sav};

const SYSMIS: f64 = -f64::MAX;
const SECONDS_TO_1970: f64 = 141_428.0 * 86_400.0;

fn padded(text: &str, width: usize, fill: u8) -> Vec<u8> {
    let mut out = text.as_bytes().to_vec();
    out.resize(width, fill);
    out
}

fn int(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn variable(out: &mut Vec<u8>, width: i32, name: &str, format: i32, label: Option<&str>, missing: &[f64]) {
    int(out, 2);
    int(out, width);
    int(out, i32::from(label.is_some()));
    int(out, missing.len() as i32);
    int(out, format);
    int(out, format);
    out.extend(padded(name, 8, b' '));
    if let Some(label) = label {
        int(out, label.len() as i32);
        out.extend(padded(label, label.len().next_multiple_of(4), b' '));
    }
    for value in missing {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Dictionary with `AGE` (labelled, 99 user-missing), `NAME` (A10) and
/// `VISIT` (DATE11), all renamed through the long-name record.
fn dictionary(compression: i32, ncases: i32) -> Vec<u8> {
    let mut out = b"$FL2".to_vec();
    out.extend(padded("@(#) SPSS DATA FILE test", 60, b' '));
    int(&mut out, 2);
    int(&mut out, 4);
    int(&mut out, compression);
    int(&mut out, 0);
    int(&mut out, ncases);
    out.extend_from_slice(&100.0f64.to_le_bytes());
    out.extend(padded("01 Jan 20", 9, b' '));
    out.extend(padded("10:00:00", 8, b' '));
    out.extend(padded("Household panel", 64, b' '));
    out.extend_from_slice(&[0, 0, 0]);

    variable(&mut out, 0, "AGE", (5 << 16) | (8 << 8) | 2, Some("Age"), &[99.0]);
    variable(&mut out, 10, "NAME", (1 << 16) | (10 << 8), None, &[]);
    variable(&mut out, -1, "", 0, None, &[]);
    variable(&mut out, 0, "VISIT", (20 << 16) | (11 << 8), Some("Visit date"), &[]);

    int(&mut out, 3);
    int(&mut out, 2);
    for (value, label) in [(1.0f64, "Young"), (2.0, "Old")] {
        out.extend_from_slice(&value.to_le_bytes());
        out.push(label.len() as u8);
        out.extend(padded(label, (label.len() + 1).next_multiple_of(8) - 1, b' '));
    }
    int(&mut out, 4);
    int(&mut out, 1);
    int(&mut out, 1);

    extension(&mut out, 13, b"AGE=AgeYears\tNAME=Name\tVISIT=Visit");
    extension(&mut out, 20, b"UTF-8");

    int(&mut out, 999);
    int(&mut out, 0);
    out
}

fn extension(out: &mut Vec<u8>, subtype: i32, body: &[u8]) {
    int(out, 7);
    int(out, subtype);
    int(out, 1);
    int(out, body.len() as i32);
    out.extend_from_slice(body);
}

fn number(value: f64) -> [u8; 8] {
    value.to_le_bytes()
}

fn uncompressed_file() -> Vec<u8> {
    let mut out = dictionary(0, 3);
    let cases: [(f64, &str, f64); 3] = [
        (30.0, "Ann", SECONDS_TO_1970 + 86_400.0),
        (99.0, "Bob", SYSMIS),
        (SYSMIS, "Cy", SECONDS_TO_1970),
    ];
    for (age, name, visit) in cases {
        out.extend(number(age));
        out.extend(padded(name, 16, b' '));
        out.extend(number(visit));
    }
    out
}

fn bytecode_file() -> Vec<u8> {
    let mut out = dictionary(1, -1);
    out.extend_from_slice(&[130, 253, 254, 253, 199, 253, 254, 255]);
    out.extend(padded("Ann", 8, b' '));
    out.extend(number(SECONDS_TO_1970 + 86_400.0));
    out.extend(padded("Bob", 8, b' '));
    out.extend_from_slice(&[255, 253, 254, 253, 252, 0, 0, 0]);
    out.extend(padded("Cy", 8, b' '));
    out.extend(number(SECONDS_TO_1970));
    out
}

fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write fixture");
    path
}

fn assert_panel(dataset: &tidy_stat::StatDataset) {
    assert_eq!(
        dataset.column_names().collect::<Vec<_>>(),
        vec!["AgeYears", "Name", "Visit"]
    );
    assert_eq!(
        dataset.columns[0].values,
        ColumnValues::Float(vec![Some(30.0), None, None])
    );
    assert_eq!(
        dataset.columns[1].values,
        ColumnValues::Text(vec![
            Some("Ann".to_string()),
            Some("Bob".to_string()),
            Some("Cy".to_string())
        ])
    );
    assert_eq!(
        dataset.columns[2].values,
        ColumnValues::Date(vec![Some(1), None, Some(0)])
    );
}

#[test]
fn reads_uncompressed_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.sav", &uncompressed_file());
    let dataset = read_sav(&path, &SavOptions::default()).expect("read sav");

    assert_panel(&dataset);
    assert_eq!(dataset.label.as_deref(), Some("Household panel"));
    let age = &dataset.columns[0];
    assert_eq!(age.label.as_deref(), Some("Age"));
    assert_eq!(age.value_labels.get(&ValueCode::Int(2)).map(String::as_str), Some("Old"));
    assert!(dataset.columns[1].value_labels.is_empty());
}

#[test]
fn reads_bytecode_compressed_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.sav", &bytecode_file());
    let dataset = read_sav(&path, &SavOptions::default()).expect("read sav");
    assert_panel(&dataset);
}

#[test]
fn applies_row_window_and_columns() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.sav", &uncompressed_file());
    let options = SavOptions::default()
        .with_cols(vec!["Visit".to_string(), "Name".to_string()])
        .with_rows(1, 1);
    let dataset = read_sav(&path, &options).expect("read sav");

    assert_eq!(dataset.column_names().collect::<Vec<_>>(), vec!["Name", "Visit"]);
    assert_eq!(
        dataset.columns[0].values,
        ColumnValues::Text(vec![Some("Bob".to_string())])
    );
}

#[test]
fn zero_limit_reads_to_the_end() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.sav", &bytecode_file());
    let dataset = read_sav(&path, &SavOptions::default().with_rows(1, 0)).expect("read sav");
    assert_eq!(dataset.num_rows(), 2);
}

#[test]
fn unknown_column_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "panel.sav", &uncompressed_file());
    let options = SavOptions::default().with_cols(vec!["Income".to_string()]);
    let err = read_sav(&path, &options).expect_err("unknown column");
    assert!(matches!(err, StatError::ColumnNotFound { column } if column == "Income"));
}
