//! Core types: assignments, calendar events, deadlines, sync windows

pub mod assignment;
pub mod deadline;
pub mod error;
pub mod event;
pub mod time;
pub mod tracing;

pub use assignment::{AssignmentRecord, ColorCode, SubmissionStatus};
pub use deadline::{deadline_datetime, parse_deadline};
pub use error::{CoreError, CoreResult};
pub use event::CalendarEvent;
pub use time::{
    CALENDAR_TIMEZONE, SyncWindow, calendar_now, deadline_to_calendar_time, same_instant,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
