//! Bearer credentials for the calendar API.
//!
//! [`CredentialProvider`] hands out a valid access token. The
//! [`AuthorizedUserFile`] implementation refreshes an expired token through
//! the token endpoint and writes the new token back to its file. The
//! interactive consent flow that produces the file is not part of this crate.

use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::gateway::BoxFuture;

use super::config::{CALENDAR_SCOPE, ClientSecrets};
use super::tokens::{AuthorizedUserToken, TokenFile};

/// Source of bearer tokens for calendar requests.
pub trait CredentialProvider: Send + Sync {
    /// Returns an access token that is valid for at least the next minute.
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>>;
}

/// An access token supplied by the caller and used as-is.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wraps an already-valid access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// Credentials backed by an authorized-user token file.
///
/// The file is read lazily on first use. When the token has expired it is
/// refreshed with the stored refresh token and the file is rewritten.
#[derive(Debug)]
pub struct AuthorizedUserFile {
    file: TokenFile,
    client_secrets_path: Option<PathBuf>,
    http_client: reqwest::Client,
    cached: Mutex<Option<AuthorizedUserToken>>,
}

impl AuthorizedUserFile {
    /// Creates credentials reading the token at `token_path`.
    pub fn new(token_path: impl Into<PathBuf>) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::internal("failed to build HTTP client").with_source(e))?;

        Ok(Self {
            file: TokenFile::new(token_path),
            client_secrets_path: None,
            http_client,
            cached: Mutex::new(None),
        })
    }

    /// Sets the client credentials file used when the token file lacks
    /// `client_id`/`client_secret`.
    pub fn with_client_secrets(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_secrets_path = Some(path.into());
        self
    }

    fn client_secrets(&self, token: &AuthorizedUserToken) -> ProviderResult<ClientSecrets> {
        if let (Some(id), Some(secret)) = (&token.client_id, &token.client_secret) {
            return Ok(ClientSecrets::new(id, secret));
        }
        match &self.client_secrets_path {
            Some(path) => ClientSecrets::from_file(path),
            None => Err(ProviderError::configuration(
                "token file has no client_id/client_secret and no credentials file is configured",
            )),
        }
    }

    async fn refresh(&self, token: &mut AuthorizedUserToken) -> ProviderResult<()> {
        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            ProviderError::authentication(format!(
                "token in {} has expired and carries no refresh token; authorize calendar access again",
                self.file.path().display()
            ))
        })?;
        let secrets = self.client_secrets(token)?;

        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        debug!(token_uri = token.token_uri(), "refreshing access token");
        let response = self
            .http_client
            .post(token.token_uri())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("token refresh request failed: {}", e))
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let refreshed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })?;

        token.update_access_token(refreshed.access_token, refreshed.expires_in, Utc::now());
        if let Some(rotated) = refreshed.refresh_token {
            token.refresh_token = Some(rotated);
        }
        self.file.save(token)?;

        info!("refreshed calendar access token");
        Ok(())
    }
}

impl CredentialProvider for AuthorizedUserFile {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            let mut cached = self.cached.lock().await;
            if cached.is_none() {
                let token = self.file.load()?;
                if !token.has_scope(CALENDAR_SCOPE) {
                    warn!(
                        path = %self.file.path().display(),
                        "token was not granted the calendar scope"
                    );
                }
                *cached = Some(token);
            }

            let token = cached
                .as_mut()
                .ok_or_else(|| ProviderError::internal("token cache is empty"))?;

            if token.is_expired(Utc::now()) {
                self.refresh(token).await?;
            }

            token
                .token
                .clone()
                .ok_or_else(|| ProviderError::invalid_response("token endpoint returned no access token"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_token(dir: &tempfile::TempDir, json: serde_json::Value) -> PathBuf {
        let path = dir.path().join("token.json");
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let creds = StaticToken::new("abc");
        assert_eq!(creds.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn valid_token_is_used_without_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_token(
            &dir,
            serde_json::json!({
                "token": "still-valid",
                "refresh_token": "r",
                "token_uri": format!("{}/token", server.uri()),
                "expiry": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
            }),
        );

        let creds = AuthorizedUserFile::new(path).unwrap();
        assert_eq!(creds.access_token().await.unwrap(), "still-valid");
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_token(
            &dir,
            serde_json::json!({
                "token": "stale",
                "refresh_token": "r-123",
                "client_id": "cid",
                "client_secret": "csecret",
                "token_uri": format!("{}/token", server.uri()),
                "expiry": "2020-01-01T00:00:00Z",
                "account": "",
            }),
        );

        let creds = AuthorizedUserFile::new(path.clone()).unwrap();
        assert_eq!(creds.access_token().await.unwrap(), "fresh");
        // Second call hits the cache.
        assert_eq!(creds.access_token().await.unwrap(), "fresh");

        let saved = TokenFile::new(path).load().unwrap();
        assert_eq!(saved.token.as_deref(), Some("fresh"));
        assert_eq!(saved.refresh_token.as_deref(), Some("r-123"));
        assert!(saved.expiry.unwrap() > Utc::now());
        assert!(saved.extra.contains_key("account"));
    }

    #[tokio::test]
    async fn refresh_falls_back_to_client_secrets_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("client_id=from-file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "fresh", "expires_in": 60})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let secrets = dir.path().join("api_credentials.json");
        std::fs::write(
            &secrets,
            r#"{"installed": {"client_id": "from-file", "client_secret": "s"}}"#,
        )
        .unwrap();
        let path = write_token(
            &dir,
            serde_json::json!({
                "refresh_token": "r",
                "token_uri": format!("{}/token", server.uri()),
            }),
        );

        let creds = AuthorizedUserFile::new(path)
            .unwrap()
            .with_client_secrets(secrets);
        assert_eq!(creds.access_token().await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn rejected_refresh_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_token(
            &dir,
            serde_json::json!({
                "refresh_token": "revoked",
                "client_id": "cid",
                "client_secret": "csecret",
                "token_uri": format!("{}/token", server.uri()),
            }),
        );

        let err = AuthorizedUserFile::new(path)
            .unwrap()
            .access_token()
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_asks_for_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_token(
            &dir,
            serde_json::json!({"token": "old", "expiry": "2020-01-01T00:00:00Z"}),
        );

        let err = AuthorizedUserFile::new(path)
            .unwrap()
            .access_token()
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("authorize"));
    }
}
