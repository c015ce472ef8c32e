//! Authorized-user token file.
//!
//! The token file uses Google's authorized-user layout (`token`,
//! `refresh_token`, `token_uri`, `client_id`, `client_secret`, `scopes`,
//! `expiry`). Unknown keys are preserved when the file is rewritten after a
//! refresh.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Default OAuth token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens expiring within this margin are refreshed early.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Contents of an authorized-user token file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizedUserToken {
    /// Current access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Refresh token used to mint new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// Access token expiry (UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Keys this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizedUserToken {
    /// Returns true if there is no access token or it expires within a minute.
    ///
    /// A token without an expiry is treated as valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), Some(expiry)) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            (Some(_), None) => false,
        }
    }

    /// Returns true if the token was granted `scope`.
    ///
    /// Files without a scope list are assumed to carry every scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|s| s == scope)
    }

    /// Stores a freshly refreshed access token.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        now: DateTime<Utc>,
    ) {
        self.token = Some(access_token.into());
        self.expiry = expires_in_secs.map(|secs| now + Duration::seconds(secs));
    }

    /// Returns the token endpoint, falling back to Google's.
    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URI)
    }
}

/// File-backed storage for an [`AuthorizedUserToken`].
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    /// Creates a token file handle at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the token from disk.
    ///
    /// A missing file is an authentication error: the consent flow that
    /// creates it runs outside this program.
    pub fn load(&self) -> ProviderResult<AuthorizedUserToken> {
        if !self.path.exists() {
            return Err(ProviderError::authentication(format!(
                "no token file at {}; authorize calendar access first",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
                .with_source(e)
        })?;

        let token: AuthorizedUserToken = serde_json::from_str(&content).map_err(|e| {
            ProviderError::authentication(format!(
                "token file {} is not usable: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), "loaded authorized-user token");
        Ok(token)
    }

    /// Writes the token to disk atomically with owner-only permissions.
    pub fn save(&self, token: &AuthorizedUserToken) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(token)
            .map_err(|e| ProviderError::internal(format!("failed to serialize token: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&temp_path, perms);
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!(path = %self.path.display(), "saved authorized-user token");
        Ok(())
    }
}
