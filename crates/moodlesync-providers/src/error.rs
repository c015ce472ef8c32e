//! Error types for the calendar gateway and the assignment source.
//!
//! Both remote boundaries report failures through [`ProviderError`]. The
//! [`ProviderErrorCode`] tells callers which failure class they are looking
//! at; nothing in this crate retries, so every error propagates as-is.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials are missing, invalid or could not be refreshed.
    AuthenticationFailed,
    /// The user lacks permission on the resource.
    AuthorizationFailed,
    /// Connection failed, DNS resolution, body read errors.
    NetworkError,
    /// The calendar API rejected the call for quota reasons.
    RateLimited,
    /// Server returned an error status.
    ServerError,
    /// The response body could not be parsed.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was invalid (400).
    BadRequest,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// A required element is absent from a scraped page.
    ElementNotFound,
    /// Unexpected internal state.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a stable snake_case name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::ElementNotFound => "element_not_found",
            Self::InternalError => "internal_error",
        }
    }

    /// Returns true for failures raised by the transport or remote service.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkError
                | Self::RateLimited
                | Self::ServerError
                | Self::NotFound
                | Self::BadRequest
                | Self::AuthorizationFailed
        )
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while talking to the site or the calendar service.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The component that raised the error (e.g. "google", "moodle").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates a scrape structure error for a missing page element.
    pub fn element_not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ElementNotFound, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Maps a failed `reqwest` send into a network error.
    pub fn transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::network(message).with_source(err)
    }

    /// Maps a non-success HTTP status into the matching error class.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        use reqwest::StatusCode;

        match status {
            StatusCode::UNAUTHORIZED => {
                Self::authentication("access token expired or invalid")
            }
            StatusCode::FORBIDDEN if body.contains("rateLimitExceeded") => {
                Self::rate_limited(format!("rate limit exceeded: {}", body))
            }
            StatusCode::FORBIDDEN => Self::authorization(format!("access denied: {}", body)),
            StatusCode::TOO_MANY_REQUESTS => Self::rate_limited("rate limit exceeded"),
            StatusCode::NOT_FOUND => Self::not_found(format!("resource not found: {}", body)),
            StatusCode::BAD_REQUEST => Self::bad_request(format!("bad request: {}", body)),
            _ => Self::server(format!("HTTP error ({}): {}", status, body)),
        }
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns true if a required page element was missing.
    pub fn is_scrape_structure(&self) -> bool {
        self.code == ProviderErrorCode::ElementNotFound
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn error_code_names() {
        assert_eq!(
            ProviderErrorCode::AuthenticationFailed.as_str(),
            "authentication_failed"
        );
        assert_eq!(
            ProviderErrorCode::ElementNotFound.as_str(),
            "element_not_found"
        );
        assert_eq!(
            ProviderErrorCode::ConfigurationError.to_string(),
            "configuration_error"
        );
    }

    #[test]
    fn transport_classification() {
        assert!(ProviderErrorCode::NetworkError.is_transport());
        assert!(ProviderErrorCode::ServerError.is_transport());
        assert!(!ProviderErrorCode::ElementNotFound.is_transport());
        assert!(!ProviderErrorCode::ConfigurationError.is_transport());
    }

    #[test]
    fn element_not_found_is_scrape_structure() {
        let err = ProviderError::element_not_found("due date row missing");
        assert!(err.is_scrape_structure());
        assert!(!ProviderError::network("reset").is_scrape_structure());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ProviderError::from_status(StatusCode::UNAUTHORIZED, "").code(),
            ProviderErrorCode::AuthenticationFailed
        );
        assert_eq!(
            ProviderError::from_status(StatusCode::FORBIDDEN, "forbidden").code(),
            ProviderErrorCode::AuthorizationFailed
        );
        assert_eq!(
            ProviderError::from_status(StatusCode::FORBIDDEN, r#"{"reason":"rateLimitExceeded"}"#)
                .code(),
            ProviderErrorCode::RateLimited
        );
        assert_eq!(
            ProviderError::from_status(StatusCode::NOT_FOUND, "").code(),
            ProviderErrorCode::NotFound
        );
        assert_eq!(
            ProviderError::from_status(StatusCode::BAD_GATEWAY, "").code(),
            ProviderErrorCode::ServerError
        );
    }

    #[test]
    fn provider_error_display() {
        let err = ProviderError::element_not_found("status row").with_provider("moodle");
        let display = format!("{}", err);
        assert!(display.contains("[moodle]"));
        assert!(display.contains("element_not_found"));
        assert!(display.contains("status row"));
    }

    #[test]
    fn provider_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = ProviderError::configuration("failed to write token").with_source(io_err);
        assert!(err.source().is_some());
    }
}
