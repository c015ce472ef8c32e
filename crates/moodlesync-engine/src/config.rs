//! Settings for one sync run.

use std::path::PathBuf;

use moodlesync_providers::moodle::{DEFAULT_MOODLE_URL, LoginMethod};

use crate::error::SyncResult;
use crate::lock::default_lock_dir;

/// Summary of the calendar deadlines are written to.
pub const DEFAULT_CALENDAR_NAME: &str = "Moodle Deadline";

/// Description given to the calendar when it has to be created.
pub const CALENDAR_DESCRIPTION: &str = "Deadline from Moodle";

/// Default number of months crawled ahead.
pub const DEFAULT_MONTHS: u32 = 6;

/// Everything a sync run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Site root.
    pub moodle_url: String,

    /// Existing `MoodleSession` cookie value.
    pub moodle_session_id: Option<String>,

    /// `{username, password}` JSON file for the login flow.
    pub moodle_cred_path: Option<PathBuf>,

    /// Use the session id instead of logging in.
    pub login_with_token: bool,

    /// Google client credentials file.
    pub google_api_path: PathBuf,

    /// Google authorized-user token file.
    pub google_token_path: PathBuf,

    /// Target calendar summary.
    pub calendar_name: String,

    /// Number of months in the sync window.
    pub num_of_months: u32,

    /// Skip assignments whose page is missing a required element.
    pub skip_unparsable_assignments: bool,

    /// Directory holding the run lock.
    pub lock_dir: PathBuf,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            moodle_url: DEFAULT_MOODLE_URL.to_string(),
            moodle_session_id: None,
            moodle_cred_path: Some(PathBuf::from("moodle_credentials.json")),
            login_with_token: false,
            google_api_path: PathBuf::from("api_credentials.json"),
            google_token_path: PathBuf::from("token.json"),
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
            num_of_months: DEFAULT_MONTHS,
            skip_unparsable_assignments: false,
            lock_dir: default_lock_dir(),
        }
    }
}

impl SyncSettings {
    /// Builder: log in with an existing session cookie.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.moodle_session_id = Some(session_id.into());
        self.login_with_token = true;
        self
    }

    /// Builder: set the window size.
    pub fn with_months(mut self, months: u32) -> Self {
        self.num_of_months = months;
        self
    }

    /// Returns how the site session should be authenticated.
    ///
    /// `login_with_token` selects the session id, otherwise the credentials
    /// file is used.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the selected input is missing.
    pub fn login_method(&self) -> SyncResult<LoginMethod> {
        let method = if self.login_with_token {
            LoginMethod::from_options(self.moodle_session_id.as_deref(), None)?
        } else {
            LoginMethod::from_options(None, self.moodle_cred_path.as_deref())?
        };
        Ok(method)
    }
}
