//! Options accepted by the data loader.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::OptionsError;

/// Default separator used inside the parenthesized combine rule.
pub const DEFAULT_PARENTHESIS_SEP: &str = ", ";

/// Default marker for a horizontally merged header cell.
pub const DEFAULT_MULTI_COL_SENTINEL: &str = "None";

/// Default worksheet opened on a remote spreadsheet.
pub const DEFAULT_REMOTE_SHEET: &str = "Sheet1";

/// Default number of header rows on a remote spreadsheet.
pub const DEFAULT_REMOTE_HEADERS: usize = 1;

/// A user-supplied source location.
///
/// `Path` is an already structured filesystem path and is never interpreted
/// as a URL. `Text` may be a relative path, a `~` path, a `file://` URL or a
/// remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Location {
    Path(PathBuf),
    Text(String),
}

impl Location {
    /// Returns true for an empty text location.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Path(path) => path.as_os_str().is_empty(),
            Self::Text(text) => text.is_empty(),
        }
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<PathBuf> for Location {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&std::path::Path> for Location {
    fn from(value: &std::path::Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

/// Worksheet selector for spreadsheet sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    /// Zero-based sheet position.
    Index(usize),
    /// Sheet title.
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl FromStr for SheetSelector {
    type Err = std::convert::Infallible;

    /// All-digit input selects by position, anything else by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = s.parse() {
                return Ok(Self::Index(index));
            }
        }
        Ok(Self::Name(s.to_string()))
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// 1-based inclusive row window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "(usize, usize)")]
pub struct RowsRange {
    first: usize,
    last: usize,
}

impl RowsRange {
    /// Creates a window covering rows `first..=last` (1-based).
    pub fn new(first: usize, last: usize) -> Result<Self, OptionsError> {
        if first == 0 || last < first {
            return Err(OptionsError::InvalidRowsRange { first, last });
        }
        Ok(Self { first, last })
    }

    /// First row (1-based).
    #[must_use]
    pub fn first(self) -> usize {
        self.first
    }

    /// Last row (1-based, inclusive).
    #[must_use]
    pub fn last(self) -> usize {
        self.last
    }

    /// Converts to a 0-based `(offset, limit)` pair.
    #[must_use]
    pub fn to_offset_limit(self) -> (usize, usize) {
        let offset = self.first - 1;
        (offset, self.last - offset)
    }
}

impl TryFrom<(usize, usize)> for RowsRange {
    type Error = OptionsError;

    fn try_from((first, last): (usize, usize)) -> Result<Self, Self::Error> {
        Self::new(first, last)
    }
}

impl FromStr for RowsRange {
    type Err = OptionsError;

    /// Parses `FIRST:LAST` or `FIRST-LAST`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionsError::RowsRangeSyntax(s.to_string());
        let (first, last) = s
            .split_once(':')
            .or_else(|| s.split_once('-'))
            .ok_or_else(invalid)?;
        let first = first.trim().parse().map_err(|_| invalid())?;
        let last = last.trim().parse().map_err(|_| invalid())?;
        Self::new(first, last)
    }
}

/// Signature of a caller-supplied header combine function.
pub type CombineFn = dyn Fn(&[String]) -> String + Send + Sync;

/// How a column's clean header levels are reduced to one name.
#[derive(Clone, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum CombineRule {
    /// `level1 (level2<sep>level3...)`.
    #[default]
    Parenthesized,
    /// `level1_level2_level3`.
    Underscore,
    /// Caller-supplied function over the clean levels.
    Custom(Arc<CombineFn>),
}

impl CombineRule {
    /// Wraps a closure as a combine rule.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }
}

impl fmt::Debug for CombineRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parenthesized => f.write_str("Parenthesized"),
            Self::Underscore => f.write_str("Underscore"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FromStr for CombineRule {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "_" | "underscore" => Ok(Self::Underscore),
            "parens" | "parenthesized" | "default" => Ok(Self::Parenthesized),
            other => Err(OptionsError::UnknownCombineRule(other.to_string())),
        }
    }
}

impl TryFrom<String> for CombineRule {
    type Error = OptionsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Options for a single load call.
///
/// Readers ignore the options they have no use for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Source location (the `fn` option).
    #[serde(alias = "fn")]
    pub location: Option<Location>,
    /// Remote spreadsheet URL.
    pub url: Option<String>,
    /// Path to the remote-spreadsheet service account credentials.
    pub credentials: Option<PathBuf>,
    /// Field separator override for delimited text.
    pub sep: Option<String>,
    /// Worksheet selector.
    pub sheet_name: Option<SheetSelector>,
    /// Column subset (SPSS).
    pub cols: Option<Vec<String>>,
    /// Row window (SPSS).
    pub rows_range: Option<RowsRange>,
    /// Number of header rows to flatten.
    pub n_headers: Option<usize>,
    pub header_combine_rule: CombineRule,
    pub combine_parenthesis_sep: String,
    pub multi_col_sentinel: String,
    /// Suppress progress notifications.
    pub silently: bool,
    /// Route to the bulk loading path (not implemented).
    pub big_data: bool,
    /// Object to pick from an RData archive.
    pub object_name: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            location: None,
            url: None,
            credentials: None,
            sep: None,
            sheet_name: None,
            cols: None,
            rows_range: None,
            n_headers: None,
            header_combine_rule: CombineRule::default(),
            combine_parenthesis_sep: DEFAULT_PARENTHESIS_SEP.to_string(),
            multi_col_sentinel: DEFAULT_MULTI_COL_SENTINEL.to_string(),
            silently: false,
            big_data: false,
            object_name: None,
        }
    }
}

impl LoadOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for a location.
    pub fn for_location(location: impl Into<Location>) -> Self {
        Self::default().with_location(location)
    }

    /// Creates options for a remote spreadsheet.
    pub fn for_remote(url: impl Into<String>, credentials: impl Into<PathBuf>) -> Self {
        Self {
            url: Some(url.into()),
            credentials: Some(credentials.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<Location>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = Some(sep.into());
        self
    }

    #[must_use]
    pub fn with_sheet(mut self, sheet: SheetSelector) -> Self {
        self.sheet_name = Some(sheet);
        self
    }

    #[must_use]
    pub fn with_cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cols = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_rows_range(mut self, range: RowsRange) -> Self {
        self.rows_range = Some(range);
        self
    }

    #[must_use]
    pub fn with_n_headers(mut self, n: usize) -> Self {
        self.n_headers = Some(n);
        self
    }

    #[must_use]
    pub fn with_combine_rule(mut self, rule: CombineRule) -> Self {
        self.header_combine_rule = rule;
        self
    }

    #[must_use]
    pub fn with_parenthesis_sep(mut self, sep: impl Into<String>) -> Self {
        self.combine_parenthesis_sep = sep.into();
        self
    }

    #[must_use]
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.multi_col_sentinel = sentinel.into();
        self
    }

    #[must_use]
    pub fn with_object_name(mut self, name: impl Into<String>) -> Self {
        self.object_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn silently(mut self, silently: bool) -> Self {
        self.silently = silently;
        self
    }

    #[must_use]
    pub fn big_data(mut self, enable: bool) -> Self {
        self.big_data = enable;
        self
    }

    /// Header rows for local files (disabled unless set).
    #[must_use]
    pub fn header_rows(&self) -> usize {
        self.n_headers.unwrap_or(0)
    }

    /// Header rows for remote spreadsheets.
    #[must_use]
    pub fn remote_header_rows(&self) -> usize {
        self.n_headers.unwrap_or(DEFAULT_REMOTE_HEADERS)
    }
}
