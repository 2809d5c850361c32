use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("invalid rows range {first}..={last}: rows are 1-based and first must not exceed last")]
    InvalidRowsRange { first: usize, last: usize },
    #[error("invalid rows range '{0}': expected FIRST:LAST")]
    RowsRangeSyntax(String),
    #[error("unknown header combine rule '{0}' (expected '_' or 'parens')")]
    UnknownCombineRule(String),
}
