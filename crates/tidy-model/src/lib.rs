//! Shared model types for tidyload.
//!
//! - [`LabelModel`]: normalized variable and value labels of a loaded table
//! - [`ValueCode`]: raw coded values keyed by value-label mappings
//! - [`LoadOptions`]: every option understood by the loader and its readers

pub mod error;
pub mod labels;
pub mod options;
pub mod value;

pub use error::OptionsError;
pub use labels::{LabelDict, LabelModel, ValueLabels};
pub use options::{
    CombineFn, CombineRule, DEFAULT_MULTI_COL_SENTINEL, DEFAULT_PARENTHESIS_SEP,
    DEFAULT_REMOTE_HEADERS, DEFAULT_REMOTE_SHEET, LoadOptions, Location, RowsRange,
    SheetSelector,
};
pub use value::ValueCode;
