//! Google API client secrets and scopes.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Scopes the authorized-user token is expected to carry.
pub const GOOGLE_SCOPES: [&str; 3] = [
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/calendar",
];

/// Scope required for reading and writing calendars.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// OAuth 2.0 client id and secret used for token refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecrets {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's client credentials JSON file.
///
/// Supports the Cloud Console layout with an `installed` or `web` section
/// and a flat layout with `client_id`/`client_secret` at the root.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<NestedSecrets>,
    web: Option<NestedSecrets>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedSecrets {
    client_id: String,
    client_secret: String,
}

impl ClientSecrets {
    /// Creates client secrets from their parts.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads client secrets from a credentials JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses client secrets from a credentials JSON string.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(secrets) = file.installed.or(file.web) {
            return Ok(Self::new(secrets.client_id, secrets.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "credentials file must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
            )),
        }
    }
}
