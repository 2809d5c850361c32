//! Remote spreadsheet access.
//!
//! [`SheetSource`] is the capability the loader needs: given a
//! service-account key file, a spreadsheet URL and a worksheet selector,
//! return every row as text. [`GoogleSheetsClient`] implements it against
//! the Google Sheets API; tests substitute their own sources.

mod client;
mod credentials;
mod error;
mod locator;

pub use client::{GoogleSheetsClient, SheetSource};
pub use credentials::{SHEETS_SCOPE, ServiceAccountKey, TOKEN_URI};
pub use error::{Result, SheetsError};
pub use locator::{pad_rows, spreadsheet_id};
