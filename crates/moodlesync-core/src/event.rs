//! Events as stored in the external calendar.

use serde::{Deserialize, Serialize};

use crate::assignment::AssignmentRecord;
use crate::time::same_instant;

/// An event already present in the external calendar.
///
/// Owned by the calendar service: read on every run, mutated through the
/// gateway, never deleted by this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Opaque identifier assigned by the calendar service.
    pub id: String,
    /// Event summary; mirrors [`AssignmentRecord::title`].
    pub title: String,
    /// Event description; mirrors [`AssignmentRecord::description`].
    pub description: Option<String>,
    /// Start `dateTime` as returned by the service.
    pub start: Option<String>,
    /// End `dateTime` as returned by the service.
    pub end: Option<String>,
    /// String-encoded color id.
    pub color_id: Option<String>,
}

impl CalendarEvent {
    /// Checks whether this event already reflects `record` exactly.
    ///
    /// Compares title, description, start, end and the color derived from
    /// the record. Start and end are compared as instants.
    pub fn is_identical_to(&self, record: &AssignmentRecord) -> bool {
        let time_matches =
            |value: &Option<String>| value.as_deref().is_some_and(|v| same_instant(&record.deadline, v));

        self.title == record.title
            && self.description.as_deref().unwrap_or_default() == record.description
            && time_matches(&self.start)
            && time_matches(&self.end)
            && self.color_id.as_deref() == Some(record.color().as_color_id().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::SubmissionStatus;

    fn record() -> AssignmentRecord {
        AssignmentRecord {
            title: "HW1".to_string(),
            deadline: "2024-8-5T23:59:00".to_string(),
            description: "<div id=\"intro\">Read chapter 1</div>".to_string(),
            can_submit: true,
            submission_status: SubmissionStatus::NotSubmitted,
        }
    }

    fn matching_event() -> CalendarEvent {
        CalendarEvent {
            id: "evt-1".to_string(),
            title: "HW1".to_string(),
            description: Some("<div id=\"intro\">Read chapter 1</div>".to_string()),
            start: Some("2024-08-05T23:59:00+08:00".to_string()),
            end: Some("2024-08-05T23:59:00+08:00".to_string()),
            color_id: Some("11".to_string()),
        }
    }

    #[test]
    fn identical_event_matches() {
        assert!(matching_event().is_identical_to(&record()));
    }

    #[test]
    fn each_field_difference_is_detected() {
        let record = record();

        let mut event = matching_event();
        event.title = "HW2".to_string();
        assert!(!event.is_identical_to(&record));

        let mut event = matching_event();
        event.description = Some("old".to_string());
        assert!(!event.is_identical_to(&record));

        let mut event = matching_event();
        event.start = Some("2024-08-06T23:59:00+08:00".to_string());
        assert!(!event.is_identical_to(&record));

        let mut event = matching_event();
        event.end = None;
        assert!(!event.is_identical_to(&record));

        let mut event = matching_event();
        event.color_id = Some("2".to_string());
        assert!(!event.is_identical_to(&record));
    }

    #[test]
    fn missing_description_equals_empty() {
        let mut record = record();
        record.description = String::new();
        let mut event = matching_event();
        event.description = None;
        assert!(event.is_identical_to(&record));
    }
}
