//! Spreadsheet URL parsing.

use url::Url;

use crate::error::{Result, SheetsError};

/// Extracts the document id from a `https://docs.google.com/spreadsheets/d/<id>/...` URL.
pub fn spreadsheet_id(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).map_err(|_| SheetsError::InvalidUrl(raw.to_string()))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["spreadsheets", "d", id, ..] if !id.is_empty() => Ok((*id).to_string()),
        _ => Err(SheetsError::InvalidUrl(raw.to_string())),
    }
}

/// Pads every row with empty cells to the width of the widest row.
#[must_use]
pub fn pad_rows(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_id() {
        assert_eq!(
            spreadsheet_id("https://docs.google.com/spreadsheets/d/1AbC-xyz_9/edit#gid=0").unwrap(),
            "1AbC-xyz_9"
        );
        assert_eq!(
            spreadsheet_id("https://docs.google.com/spreadsheets/d/key123").unwrap(),
            "key123"
        );
    }

    #[test]
    fn test_rejects_other_urls() {
        assert!(spreadsheet_id("https://docs.google.com/document/d/abc/edit").is_err());
        assert!(spreadsheet_id("not a url").is_err());
    }

    #[test]
    fn test_pad_rows() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["1".to_string()],
        ];
        let padded = pad_rows(rows);
        assert_eq!(padded[1], vec!["1".to_string(), String::new(), String::new()]);
    }
}
