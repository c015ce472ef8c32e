//! CalendarGateway trait definition.
//!
//! This module defines the [`CalendarGateway`] trait, the narrow set of
//! calendar operations the reconciliation engine needs: find or create the
//! target calendar, list events in a range, create and update events.
//!
//! All times crossing this boundary are RFC 3339 strings carrying the
//! `+08:00` offset. Deadlines are instants, so an event's start and end are
//! always equal.

use std::future::Future;
use std::pin::Pin;

use moodlesync_core::{AssignmentRecord, CalendarEvent, deadline_to_calendar_time};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe so the engine can hold
/// `Box<dyn CalendarGateway>` and swap in fakes under test.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Information about a calendar in the user's calendar list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    /// Unique identifier for the calendar.
    pub id: String,
    /// Calendar summary (its display name).
    pub summary: String,
    /// Description of the calendar, if available.
    pub description: Option<String>,
    /// Whether this is the user's primary calendar.
    pub primary: bool,
    /// The timezone of the calendar (IANA identifier).
    pub time_zone: Option<String>,
}

impl CalendarInfo {
    /// Creates a new CalendarInfo with the given ID and summary.
    pub fn new(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            description: None,
            primary: false,
            time_zone: None,
        }
    }
}

/// The fields written to the calendar when creating or updating an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    /// Event summary.
    pub title: String,
    /// Start `dateTime`.
    pub start: String,
    /// End `dateTime`; equal to `start` for deadlines.
    pub end: String,
    /// Event description (raw HTML).
    pub description: String,
    /// String-encoded color id.
    pub color_id: String,
}

impl EventDraft {
    /// Builds the event body mirroring an assignment.
    pub fn for_assignment(record: &AssignmentRecord) -> Self {
        let at = deadline_to_calendar_time(&record.deadline);
        Self {
            title: record.title.clone(),
            start: at.clone(),
            end: at,
            description: record.description.clone(),
            color_id: record.color().as_color_id(),
        }
    }
}

/// Create/read/update operations against an external calendar.
///
/// Implementations receive an already-authenticated credential; token
/// refresh happens behind [`crate::google::CredentialProvider`].
pub trait CalendarGateway: Send + Sync {
    /// Returns the name of this gateway (e.g. "google").
    fn name(&self) -> &str;

    /// Lists the calendars visible to the user.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>>;

    /// Creates a calendar and returns its id.
    fn create_calendar<'a>(
        &'a self,
        summary: &'a str,
        description: &'a str,
    ) -> BoxFuture<'a, ProviderResult<String>>;

    /// Lists events of `calendar_id` in `[time_min, time_max)`.
    ///
    /// Pagination is handled internally.
    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;

    /// Creates an event and returns its web link, if the service sends one.
    fn create_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>>;

    /// Replaces an existing event and returns its web link.
    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>>;
}
