//! Scraped assignment records and the submission-state color mapping.
//!
//! An [`AssignmentRecord`] is built fresh on every crawl and only lives for
//! the duration of one sync run. Its `title` is the only key shared with the
//! external calendar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Status labels shown when nothing has been handed in yet.
pub const NOT_SUBMITTED_LABELS: [&str; 2] = ["沒有繳交作業", "這個作業還沒人繳交"];

/// Prefix of the status label shown once a submission exists.
pub const SUBMITTED_PREFIX: &str = "已繳交";

/// Whether the current user has handed in an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Nothing submitted yet.
    NotSubmitted,
    /// A submission exists.
    Submitted,
    /// The page showed a status we do not recognize.
    Unknown,
}

impl SubmissionStatus {
    /// Classifies the text of the "繳交狀態" table cell.
    ///
    /// Prefix `已繳交` means submitted, the known "nothing submitted"
    /// phrasings mean not submitted, anything else is unknown.
    pub fn classify(text: &str) -> Self {
        let text = text.trim();
        if NOT_SUBMITTED_LABELS.contains(&text) {
            Self::NotSubmitted
        } else if text.starts_with(SUBMITTED_PREFIX) {
            Self::Submitted
        } else {
            Self::Unknown
        }
    }

    /// Returns the canonical label of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSubmitted => "not_submitted",
            Self::Submitted => "submitted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_submitted" => Ok(Self::NotSubmitted),
            "submitted" => Ok(Self::Submitted),
            "unknown" => Ok(Self::Unknown),
            other => Err(CoreError::submission_status(other)),
        }
    }
}

/// Calendar color signalling how urgent an assignment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorCode {
    /// Closed or unknown state.
    Gray,
    /// Open and not yet submitted.
    Red,
    /// Submitted.
    Green,
}

impl ColorCode {
    /// Maps the submission state onto a color.
    ///
    /// A closed submission window or a missing/unknown status is always gray.
    pub fn for_status(can_submit: bool, status: Option<SubmissionStatus>) -> Self {
        match (can_submit, status) {
            (false, _) | (_, None) | (_, Some(SubmissionStatus::Unknown)) => Self::Gray,
            (true, Some(SubmissionStatus::NotSubmitted)) => Self::Red,
            (true, Some(SubmissionStatus::Submitted)) => Self::Green,
        }
    }

    /// Derives a color from a raw status label.
    ///
    /// `None` and the empty string count as a missing status.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SubmissionStatus`] when the label is outside
    /// `not_submitted`, `submitted` and `unknown` and the window is open.
    pub fn derive(can_submit: bool, status: Option<&str>) -> CoreResult<Self> {
        let status = match status {
            None | Some("") => None,
            Some(label) => match label.parse::<SubmissionStatus>() {
                Ok(parsed) => Some(parsed),
                Err(_) if !can_submit => None,
                Err(e) => return Err(e),
            },
        };
        Ok(Self::for_status(can_submit, status))
    }

    /// Returns the calendar service color id.
    pub fn id(&self) -> u8 {
        match self {
            Self::Gray => 8,
            Self::Red => 11,
            Self::Green => 2,
        }
    }

    /// Returns the color id in the string form the calendar API uses.
    pub fn as_color_id(&self) -> String {
        self.id().to_string()
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One scraped deadline item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Page heading, used as the matching key against calendar events.
    pub title: String,
    /// Canonical deadline string (`YYYY-M-DTHH:MM:00`, no offset).
    pub deadline: String,
    /// Raw HTML of the assignment intro block.
    pub description: String,
    /// Whether the submission window is still open.
    pub can_submit: bool,
    /// Classified submission status.
    pub submission_status: SubmissionStatus,
}

impl AssignmentRecord {
    /// Returns the color this record should be rendered with.
    pub fn color(&self) -> ColorCode {
        ColorCode::for_status(self.can_submit, Some(self.submission_status))
    }
}
