//! Google Calendar gateway implementation.
//!
//! [`GoogleCalendarClient`] talks to the Calendar v3 REST API. Credentials
//! come from a [`CredentialProvider`]; [`AuthorizedUserFile`] reads the
//! authorized-user token file and refreshes it when it expires.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use moodlesync_providers::google::{AuthorizedUserFile, GoogleCalendarClient};
//!
//! let credentials = AuthorizedUserFile::new("token.json")?
//!     .with_client_secrets("api_credentials.json");
//! let gateway = GoogleCalendarClient::new(Arc::new(credentials))?;
//! let calendars = gateway.list_calendars().await?;
//! ```

mod client;
mod config;
mod credentials;
mod tokens;

pub use client::{CALENDAR_API_BASE, GoogleCalendarClient};
pub use config::{CALENDAR_SCOPE, ClientSecrets, GOOGLE_SCOPES};
pub use credentials::{AuthorizedUserFile, CredentialProvider, StaticToken};
pub use tokens::{AuthorizedUserToken, GOOGLE_TOKEN_URI, TokenFile};
