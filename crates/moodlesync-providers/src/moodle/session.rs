//! Authenticated Moodle sessions.
//!
//! A session is either seeded with an existing `MoodleSession` cookie or
//! established through the login form: fetch the home page, read the login
//! token, post it back with the user's credentials. There is no retry; a
//! failed request surfaces as the transport error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::extract;

/// Default site root.
pub const DEFAULT_MOODLE_URL: &str = "https://moodle.ncku.edu.tw";

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "MoodleSession";

const PROVIDER_NAME: &str = "moodle";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/53.0.2785.143 Safari/537.36";

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Site login credentials, read from a `{username, password}` JSON file.
#[derive(Clone, Deserialize)]
pub struct MoodleCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for MoodleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoodleCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl MoodleCredentials {
    /// Loads credentials from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials {}: {}",
                path.display(),
                e
            ))
            .with_provider(PROVIDER_NAME)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "credentials {} must be a JSON object with username and password: {}",
                path.display(),
                e
            ))
            .with_provider(PROVIDER_NAME)
        })
    }
}

/// How a session gets authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMethod {
    /// Inject an existing `MoodleSession` cookie.
    SessionId(String),
    /// Log in with the credentials stored at this path.
    Credentials(PathBuf),
}

impl LoginMethod {
    /// Picks the login method from the two optional inputs.
    ///
    /// A non-empty session id wins over a credentials path.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when neither input is supplied.
    pub fn from_options(
        session_id: Option<&str>,
        credentials_path: Option<&Path>,
    ) -> ProviderResult<Self> {
        match (session_id.filter(|id| !id.is_empty()), credentials_path) {
            (Some(id), _) => Ok(Self::SessionId(id.to_string())),
            (None, Some(path)) => Ok(Self::Credentials(path.to_path_buf())),
            (None, None) => Err(ProviderError::configuration(
                "either a session id or a credentials path must be specified",
            )
            .with_provider(PROVIDER_NAME)),
        }
    }
}

/// Builds authenticated [`MoodleSession`]s.
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    base_url: Url,
    method: LoginMethod,
}

impl SessionAuthenticator {
    /// Creates an authenticator for the site at `base_url`.
    pub fn new(base_url: &str, method: LoginMethod) -> ProviderResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            method,
        })
    }

    /// Opens a session using the configured login method.
    pub async fn authenticate(&self) -> ProviderResult<MoodleSession> {
        let jar = Arc::new(Jar::default());
        let session = MoodleSession::new(self.base_url.clone(), jar.clone())?;

        match &self.method {
            LoginMethod::SessionId(id) => {
                debug!("using provided {} cookie", SESSION_COOKIE);
                jar.add_cookie_str(&format!("{}={}; Path=/", SESSION_COOKIE, id), &self.base_url);
            }
            LoginMethod::Credentials(path) => {
                let credentials = MoodleCredentials::from_file(path)?;
                session.login(&credentials).await?;
            }
        }

        Ok(session)
    }
}

fn parse_base_url(raw: &str) -> ProviderResult<Url> {
    let mut url = Url::parse(raw).map_err(|e| {
        ProviderError::configuration(format!("invalid site url '{}': {}", raw, e))
            .with_provider(PROVIDER_NAME)
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// An HTTP session with the site, carrying its cookie jar.
#[derive(Debug, Clone)]
pub struct MoodleSession {
    http_client: reqwest::Client,
    base_url: Url,
}

impl MoodleSession {
    fn new(base_url: Url, jar: Arc<Jar>) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(jar)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to build HTTP client")
                    .with_provider(PROVIDER_NAME)
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Returns the site root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` against the site root.
    pub fn url(&self, path: &str) -> ProviderResult<Url> {
        self.base_url.join(path).map_err(|e| {
            ProviderError::configuration(format!("invalid site path '{}': {}", path, e))
                .with_provider(PROVIDER_NAME)
        })
    }

    /// Fetches a page and returns its body.
    ///
    /// Non-success statuses are transport errors.
    pub async fn get_page(&self, url: Url) -> ProviderResult<String> {
        debug!(%url, "fetching page");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e).with_provider(PROVIDER_NAME))?;
        read_body(response).await
    }

    async fn login(&self, credentials: &MoodleCredentials) -> ProviderResult<()> {
        let home = self.get_page(self.base_url.clone()).await?;
        let login_token = extract::login_token(&home).map_err(|e| e.with_provider(PROVIDER_NAME))?;

        let form = [
            ("anchor", ""),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("logintoken", login_token.as_str()),
        ];

        let response = self
            .http_client
            .post(self.url("login/index.php")?)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e).with_provider(PROVIDER_NAME))?;
        debug!(landed = %response.url(), "submitted login form");
        read_body(response).await?;

        info!(username = %credentials.username, "logged in to Moodle");
        Ok(())
    }

    /// Returns the id of the logged-in user.
    pub async fn user_id(&self) -> ProviderResult<String> {
        let home = self.get_page(self.base_url.clone()).await?;
        extract::user_id(&home).map_err(|e| e.with_provider(PROVIDER_NAME))
    }
}

async fn read_body(response: reqwest::Response) -> ProviderResult<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(status, &body).with_provider(PROVIDER_NAME));
    }
    response.text().await.map_err(|e| {
        ProviderError::network(format!("failed to read response: {}", e))
            .with_provider(PROVIDER_NAME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOGIN_PAGE: &str = r#"<form action="/login/index.php" method="post">
        <input type="hidden" name="logintoken" value="tok-abc"></form>"#;

    #[test]
    fn neither_input_is_configuration_error() {
        let err = LoginMethod::from_options(None, None).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        let err = LoginMethod::from_options(Some(""), None).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn session_id_wins_over_credentials() {
        let method =
            LoginMethod::from_options(Some("abc"), Some(Path::new("creds.json"))).unwrap();
        assert_eq!(method, LoginMethod::SessionId("abc".to_string()));

        let method = LoginMethod::from_options(None, Some(Path::new("creds.json"))).unwrap();
        assert_eq!(method, LoginMethod::Credentials(PathBuf::from("creds.json")));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("https://moodle.example/sub").unwrap();
        assert_eq!(url.as_str(), "https://moodle.example/sub/");
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = MoodleCredentials {
            username: "student".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("student"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn injected_session_cookie_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("cookie", "MoodleSession=abc"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="popover-region-notifications" data-userid="77"></div>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let session = SessionAuthenticator::new(
            &server.uri(),
            LoginMethod::SessionId("abc".to_string()),
        )
        .unwrap()
        .authenticate()
        .await
        .unwrap();

        assert_eq!(session.user_id().await.unwrap(), "77");
    }

    #[tokio::test]
    async fn login_flow_posts_token_and_keeps_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/index.php"))
            .and(body_string_contains("logintoken=tok-abc"))
            .and(body_string_contains("username=student"))
            .and(body_string_contains("anchor="))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "MoodleSession=fresh; Path=/")
                    .set_body_string("<html>dashboard</html>"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendar/view.php"))
            .and(header("cookie", "MoodleSession=fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let creds = dir.path().join("moodle_credentials.json");
        std::fs::write(&creds, r#"{"username": "student", "password": "pw"}"#).unwrap();

        let session = SessionAuthenticator::new(&server.uri(), LoginMethod::Credentials(creds))
            .unwrap()
            .authenticate()
            .await
            .unwrap();

        let url = session.url("calendar/view.php").unwrap();
        session.get_page(url).await.unwrap();
    }

    #[tokio::test]
    async fn missing_credentials_file_is_configuration_error() {
        let server = MockServer::start().await;
        let err = SessionAuthenticator::new(
            &server.uri(),
            LoginMethod::Credentials(PathBuf::from("/nonexistent/moodle_credentials.json")),
        )
        .unwrap()
        .authenticate()
        .await
        .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn login_transport_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let creds = dir.path().join("moodle_credentials.json");
        std::fs::write(&creds, r#"{"username": "u", "password": "p"}"#).unwrap();

        let err = SessionAuthenticator::new(&server.uri(), LoginMethod::Credentials(creds))
            .unwrap()
            .authenticate()
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.provider(), Some("moodle"));
    }
}
