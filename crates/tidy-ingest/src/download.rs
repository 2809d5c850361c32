//! Fetching remote files to a local temporary copy.

use std::io::Write;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, USER_AGENT};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::error::{IngestError, Result};

/// User agent string for download requests.
const USER_AGENT_VALUE: &str = concat!("tidyload/", env!("CARGO_PKG_VERSION"));

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads `url` into a temporary file ending in `.<extension>`.
///
/// The file is removed when the returned handle is dropped.
pub fn download_to_temp(url: &Url, extension: &str) -> Result<NamedTempFile> {
    let failed = |message: String| IngestError::Download {
        url: url.to_string(),
        message,
    };

    info!("Starting download from {}", url);
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| failed(e.to_string()))?;
    let response = client
        .get(url.clone())
        .header(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE))
        .send()
        .map_err(|e| failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("server returned status {status}")));
    }
    let body = response.bytes().map_err(|e| failed(e.to_string()))?;

    let suffix = format!(".{extension}");
    let mut file = tempfile::Builder::new()
        .prefix("tidyload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| IngestError::FileRead {
            path: std::env::temp_dir(),
            source: e,
        })?;
    file.write_all(&body)
        .and_then(|()| file.flush())
        .map_err(|e| IngestError::FileRead {
            path: file.path().to_path_buf(),
            source: e,
        })?;

    debug!(path = %file.path().display(), size = %format_bytes(body.len() as u64), "download complete");
    Ok(file)
}

/// Formats a byte count in human-readable form.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
