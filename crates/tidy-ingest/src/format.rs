//! Format registry: file extensions grouped by reader family.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::path::Path;

use crate::readers::{
    DelimitedReader, FormatReader, RDataReader, SpreadsheetReader, SpssReader, StataReader,
};

/// A family of file formats handled by one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Delimited,
    Spreadsheet,
    RData,
    Stata,
    Spss,
}

/// Registry entry: family, label and the extensions it claims.
#[derive(Debug, Clone, Copy)]
pub struct FormatEntry {
    pub format: FileFormat,
    pub label: &'static str,
    pub extensions: &'static [&'static str],
}

const REGISTRY: [FormatEntry; 5] = [
    FormatEntry {
        format: FileFormat::Delimited,
        label: "csv-like",
        extensions: &[".csv", ".CSV", ".tsv", ".TSV", ".dat", ".DAT", ".txt", ".TXT"],
    },
    FormatEntry {
        format: FileFormat::Spreadsheet,
        label: "excel-like",
        extensions: &[
            ".xls", ".xlsx", ".xlt", ".XLT", ".xltx", ".XLTX", ".ods", ".ODS", ".XLS", ".XLSX",
        ],
    },
    FormatEntry {
        format: FileFormat::RData,
        label: "R files",
        extensions: &[".Rdata", ".rdata", ".rda", ".rds"],
    },
    FormatEntry {
        format: FileFormat::Stata,
        label: "Stata files",
        extensions: &[".dta", ".DTA"],
    },
    FormatEntry {
        format: FileFormat::Spss,
        label: "SPSS files",
        extensions: &[".sav"],
    },
];

/// The registry, in display order.
#[must_use]
pub fn accepted_file_formats() -> &'static [FormatEntry] {
    &REGISTRY
}

/// Human-readable listing of the accepted formats.
#[must_use]
pub fn describe_accepted_formats() -> String {
    let mut out = String::new();
    for entry in &REGISTRY {
        let exts: BTreeSet<String> = entry
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        let exts: Vec<String> = exts.into_iter().collect();
        let _ = writeln!(out, "- {}: {}", entry.label, exts.join(", "));
    }
    out.push_str("- URL: URL with any of the supported file types\n");
    out.push_str("- Google Drive Spreadsheet: See documentation\n");
    out
}

impl FileFormat {
    /// Looks up an extension, with or without the leading dot. Case-sensitive.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        REGISTRY
            .iter()
            .find(|entry| {
                entry
                    .extensions
                    .iter()
                    .any(|candidate| &candidate[1..] == ext)
            })
            .map(|entry| entry.format)
    }

    /// Looks up the extension of a path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(&path.extension()?.to_string_lossy())
    }

    fn entry(self) -> &'static FormatEntry {
        // Every variant has exactly one registry row.
        match self {
            Self::Delimited => &REGISTRY[0],
            Self::Spreadsheet => &REGISTRY[1],
            Self::RData => &REGISTRY[2],
            Self::Stata => &REGISTRY[3],
            Self::Spss => &REGISTRY[4],
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        self.entry().label
    }

    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        self.entry().extensions
    }

    /// The reader for this family.
    #[must_use]
    pub fn reader(self) -> Box<dyn FormatReader> {
        match self {
            Self::Delimited => Box::new(DelimitedReader),
            Self::Spreadsheet => Box::new(SpreadsheetReader),
            Self::RData => Box::new(RDataReader),
            Self::Stata => Box::new(StataReader),
            Self::Spss => Box::new(SpssReader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_extension_maps_to_its_family() {
        for entry in accepted_file_formats() {
            for ext in entry.extensions {
                assert_eq!(FileFormat::from_extension(ext), Some(entry.format), "{ext}");
                assert_eq!(entry.format.extensions(), entry.extensions);
            }
        }
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        assert_eq!(FileFormat::from_extension("Csv"), None);
        assert_eq!(FileFormat::from_extension("SAV"), None);
        assert_eq!(FileFormat::from_extension("RDS"), None);
        assert_eq!(FileFormat::from_extension("xlsx"), Some(FileFormat::Spreadsheet));
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("/data/panel.RData")),
            None
        );
        assert_eq!(
            FileFormat::from_path(Path::new("/data/panel.Rdata")),
            Some(FileFormat::RData)
        );
        assert_eq!(FileFormat::from_path(Path::new("/data/noext")), None);
    }

    #[test]
    fn test_describe_accepted_formats() {
        insta::assert_snapshot!(describe_accepted_formats(), @r"
        - csv-like: csv, dat, tsv, txt
        - excel-like: ods, xls, xlsx, xlt, xltx
        - R files: rda, rdata, rds
        - Stata files: dta
        - SPSS files: sav
        - URL: URL with any of the supported file types
        - Google Drive Spreadsheet: See documentation
        ");
    }
}
