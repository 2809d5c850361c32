//! Google Sheets client.
//!
//! Authenticates with a service-account key (JWT bearer grant) and reads a
//! whole worksheet through the values API. The access token lives only for
//! one [`SheetSource::fetch_rows`] call.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tidy_model::SheetSelector;
use tracing::debug;
use url::Url;

use crate::credentials::{SHEETS_SCOPE, ServiceAccountKey};
use crate::error::{Result, SheetsError};
use crate::locator::{pad_rows, spreadsheet_id};

/// Sheets API base URL.
const SHEETS_API_URL: &str = "https://sheets.googleapis.com";

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of worksheet rows.
pub trait SheetSource {
    /// Fetch every row of the selected worksheet as text.
    ///
    /// Rows are padded with empty strings to a common width.
    fn fetch_rows(
        &self,
        credentials: &Path,
        url: &str,
        sheet: &SheetSelector,
    ) -> Result<Vec<Vec<String>>>;
}

impl<T: SheetSource + ?Sized> SheetSource for &T {
    fn fetch_rows(
        &self,
        credentials: &Path,
        url: &str,
        sheet: &SheetSelector,
    ) -> Result<Vec<Vec<String>>> {
        (**self).fetch_rows(credentials, url, sheet)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// [`SheetSource`] backed by the Google Sheets v4 API.
pub struct GoogleSheetsClient {
    client: Client,
    api_base: String,
}

impl GoogleSheetsClient {
    /// Create a client for the public API endpoint.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SheetsError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_base: SHEETS_API_URL.to_string(),
        })
    }

    /// Point the client at another API root.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn access_token(&self, key: &ServiceAccountKey) -> Result<String> {
        let assertion = key.assertion(SHEETS_SCOPE)?;
        debug!(client = %key.client_email, "requesting access token");
        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SheetsError::Auth(format!("token endpoint returned {status}: {message}")));
        }
        let token: TokenResponse = response.json()?;
        Ok(token.access_token)
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|_| SheetsError::InvalidUrl(self.api_base.clone()))?;
        url.path_segments_mut()
            .map_err(|()| SheetsError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url, token: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(USER_AGENT, format!("tidyload/{}", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
            .send()?;
        Ok(response)
    }

    fn sheet_title(&self, id: &str, sheet: &SheetSelector, token: &str) -> Result<String> {
        let index = match sheet {
            SheetSelector::Name(name) => return Ok(name.clone()),
            SheetSelector::Index(index) => *index,
        };
        let mut url = self.api_url(&["v4", "spreadsheets", id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let response = api_response(self.get(url, token)?)?;
        let meta: SpreadsheetMeta = response.json()?;
        meta.sheets
            .into_iter()
            .nth(index)
            .map(|s| s.properties.title)
            .ok_or_else(|| SheetsError::WorksheetNotFound {
                name: index.to_string(),
            })
    }
}

impl SheetSource for GoogleSheetsClient {
    fn fetch_rows(
        &self,
        credentials: &Path,
        url: &str,
        sheet: &SheetSelector,
    ) -> Result<Vec<Vec<String>>> {
        let id = spreadsheet_id(url)?;
        let key = ServiceAccountKey::from_file(credentials)?;
        let token = self.access_token(&key)?;
        let title = self.sheet_title(&id, sheet, &token)?;

        let range = format!("'{}'", title.replace('\'', "''"));
        let values_url = self.api_url(&["v4", "spreadsheets", &id, "values", &range])?;
        let response = self.get(values_url, &token)?;
        if response.status().as_u16() == 400 {
            return Err(SheetsError::WorksheetNotFound { name: title });
        }
        let range: ValueRange = api_response(response)?.json()?;
        let rows: Vec<Vec<String>> = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        debug!(spreadsheet = %id, worksheet = %title, rows = rows.len(), "fetched worksheet");
        Ok(pad_rows(rows))
    }
}

fn api_response(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response.text().unwrap_or_else(|_| "Unknown error".to_string());
    Err(SheetsError::Api { status, message })
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
