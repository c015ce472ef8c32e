//! Remote boundaries of a sync run.
//!
//! This crate provides the two sides the engine reconciles:
//!
//! - [`CalendarGateway`] - create/read/update operations on an external
//!   calendar, implemented for Google Calendar in [`google`]
//! - [`AssignmentSource`] - crawled assignment records, implemented for
//!   Moodle in [`moodle`]
//! - [`ProviderError`] - error type shared by both
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐        ┌──────────────────────┐
//! │  Moodle site     │        │  Google Calendar API │
//! └────────┬─────────┘        └──────────┬───────────┘
//!          │                             │
//!          ▼                             ▼
//! ┌──────────────────┐        ┌──────────────────────┐
//! │  MoodleCrawler   │        │ GoogleCalendarClient │
//! └────────┬─────────┘        └──────────┬───────────┘
//!          │ AssignmentSource            │ CalendarGateway
//!          └──────────────┬──────────────┘
//!                         ▼
//!                    SyncEngine
//! ```

pub mod error;
pub mod gateway;
pub mod google;
pub mod moodle;
pub mod source;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use gateway::{BoxFuture, CalendarGateway, CalendarInfo, EventDraft};
pub use source::{AssignmentSource, CrawlOutcome, ScrapePolicy};
