//! Native readers for statistical package data files.
//!
//! This crate decodes the files produced by Stata, SPSS and R into a
//! format-neutral [`StatDataset`]: named columns with variable labels and
//! code → label mappings.
//!
//! # Formats
//!
//! - Stata `.dta`, releases 113–115 and 117–119 (strL included)
//! - SPSS `.sav`, uncompressed or bytecode-compressed, and zlib `.zsav`
//! - R `.rds` and `.RData`/`.rda`, XDR or native, plain or gzip
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use tidy_stat::{SavOptions, read_dta_labels, read_sav};
//!
//! let survey = read_sav(Path::new("survey.sav"), &SavOptions::default()).unwrap();
//! println!("{} rows", survey.num_rows());
//!
//! let labels = read_dta_labels(Path::new("auto.dta")).unwrap();
//! println!("{:?}", labels.variables);
//! ```

mod bytes;
pub mod dta;
mod error;
pub mod rdata;
pub mod sav;
pub mod temporal;
mod types;

pub use bytes::Endian;
pub use dta::{read_dta, read_dta_labels};
pub use error::{Result, StatError};
pub use rdata::read_r;
pub use sav::{SavOptions, read_sav};
pub use types::{ColumnValues, FileLabels, StatColumn, StatDataset};
