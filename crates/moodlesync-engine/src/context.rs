//! Resources owned by one sync run.

use std::sync::Arc;

use moodlesync_providers::google::{AuthorizedUserFile, GoogleCalendarClient};
use moodlesync_providers::moodle::{MoodleCrawler, SessionAuthenticator};
use moodlesync_providers::{AssignmentSource, CalendarGateway};
use tracing::debug;

use crate::config::SyncSettings;
use crate::error::SyncResult;

/// The authenticated site session and calendar gateway of a single run.
///
/// Nothing here is shared between runs. Dropping the context releases the
/// session and its cookie jar.
pub struct SyncContext {
    gateway: Box<dyn CalendarGateway>,
    source: Box<dyn AssignmentSource>,
}

impl SyncContext {
    /// Wraps an already-built gateway and source.
    pub fn new(gateway: Box<dyn CalendarGateway>, source: Box<dyn AssignmentSource>) -> Self {
        Self { gateway, source }
    }

    /// Opens the Google gateway and logs in to the site.
    pub async fn open(settings: &SyncSettings) -> SyncResult<Self> {
        let credentials = AuthorizedUserFile::new(&settings.google_token_path)?
            .with_client_secrets(&settings.google_api_path);
        let gateway = GoogleCalendarClient::new(Arc::new(credentials))?;

        let session = SessionAuthenticator::new(&settings.moodle_url, settings.login_method()?)?
            .authenticate()
            .await?;
        debug!(site = %session.base_url(), "opened site session");

        Ok(Self::new(
            Box::new(gateway),
            Box::new(MoodleCrawler::new(session)),
        ))
    }

    /// Returns the calendar gateway.
    pub fn gateway(&self) -> &dyn CalendarGateway {
        self.gateway.as_ref()
    }

    /// Returns the assignment source.
    pub fn source(&self) -> &dyn AssignmentSource {
        self.source.as_ref()
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("gateway", &self.gateway.name())
            .field("source", &self.source.name())
            .finish()
    }
}

/// Logs in to the site and returns the user id it reports.
pub async fn check_session(settings: &SyncSettings) -> SyncResult<String> {
    let session = SessionAuthenticator::new(&settings.moodle_url, settings.login_method()?)?
        .authenticate()
        .await?;
    Ok(session.user_id().await?)
}
