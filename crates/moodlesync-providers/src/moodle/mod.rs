//! Moodle assignment source.
//!
//! [`SessionAuthenticator`] opens a [`MoodleSession`] (injected cookie or
//! login form). [`MoodleCrawler`] walks the month views of a sync window and
//! scrapes one record per assignment page. Page layout knowledge lives in
//! [`extract`].

pub mod extract;

mod crawler;
mod session;

pub use crawler::MoodleCrawler;
pub use session::{
    DEFAULT_MOODLE_URL, LoginMethod, MoodleCredentials, MoodleSession, SESSION_COOKIE,
    SessionAuthenticator,
};
