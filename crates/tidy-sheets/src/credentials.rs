//! Service-account key files and signed token assertions.

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetsError};

/// Default OAuth token endpoint.
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read-only spreadsheet scope.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Assertion lifetime in seconds.
const ASSERTION_LIFETIME: i64 = 3600;

/// The subset of a service-account JSON key used for authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccountKey {
    /// Load a key from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SheetsError::Credentials {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| SheetsError::Credentials {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Sign a JWT bearer assertion for the token endpoint.
    pub fn assertion(&self, scope: &str) -> Result<String> {
        self.assertion_at(scope, Utc::now().timestamp())
    }

    fn assertion_at(&self, scope: &str, issued_at: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);
        let claims = Claims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SheetsError::Auth(format!("invalid private key: {e}")))?;
        jsonwebtoken::encode(&header, &claims, &key).map_err(|e| SheetsError::Auth(e.to_string()))
    }
}
