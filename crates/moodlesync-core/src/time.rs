//! Time handling for the sync window.
//!
//! This module provides [`SyncWindow`], which derives both the month anchors
//! used to crawl the site's month view and the matching calendar query
//! range, plus helpers to move deadlines into the calendar's fixed `+08:00`
//! offset.
//!
//! The crawl and the calendar query must cover the same span, otherwise
//! matching silently misses events. Both are computed from the same
//! [`SyncWindow`] so they cannot drift apart.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::deadline::deadline_datetime;
use crate::error::{CoreError, CoreResult};

/// IANA name of the timezone deadlines are expressed in.
pub const CALENDAR_TIMEZONE: &str = "Asia/Taipei";

/// UTC offset of [`CALENDAR_TIMEZONE`] in seconds.
const CALENDAR_OFFSET_SECS: i32 = 8 * 3600;

/// Day of month used for month anchors.
const ANCHOR_DAY: u32 = 5;

/// Returns the fixed `+08:00` offset.
pub fn calendar_offset() -> FixedOffset {
    FixedOffset::east_opt(CALENDAR_OFFSET_SECS).expect("valid +08:00 offset")
}

/// Returns the current time in the calendar offset.
pub fn calendar_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&calendar_offset())
}

/// Interprets a naive local datetime at `+08:00`.
pub fn at_calendar_offset(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    // A fixed offset has no gaps or folds, so the mapping is always single.
    calendar_offset()
        .from_local_datetime(&naive)
        .single()
        .expect("fixed offsets map local times uniquely")
}

/// Formats a timestamp the way the calendar API expects.
pub fn format_calendar_time(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Converts a canonical deadline into an RFC 3339 string at `+08:00`.
///
/// Deadlines that cannot be parsed are passed through unchanged; the
/// calendar receives them together with [`CALENDAR_TIMEZONE`].
pub fn deadline_to_calendar_time(deadline: &str) -> String {
    match deadline_datetime(deadline) {
        Some(naive) => format_calendar_time(&at_calendar_offset(naive)),
        None => deadline.to_string(),
    }
}

/// Checks whether a deadline and a calendar `dateTime` denote the same moment.
///
/// The deadline is read at `+08:00`; the calendar value is RFC 3339. When
/// either side does not parse, the raw strings are compared instead.
pub fn same_instant(deadline: &str, calendar_time: &str) -> bool {
    let lhs = deadline_datetime(deadline).map(at_calendar_offset);
    let rhs = DateTime::parse_from_rfc3339(calendar_time).ok();
    match (lhs, rhs) {
        (Some(a), Some(b)) => a == b,
        _ => deadline == calendar_time,
    }
}

/// The forward-looking span of months covered by one sync run.
///
/// The window starts at the first day of the month containing "now" and
/// spans `months` whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    /// First day of the first month in the window.
    first_month: NaiveDate,
    /// Number of months covered.
    months: u32,
}

impl SyncWindow {
    /// Creates a window of `months` months starting at the month of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyWindow`] when `months` is zero.
    pub fn new<Tz: TimeZone>(now: DateTime<Tz>, months: u32) -> CoreResult<Self> {
        if months == 0 {
            return Err(CoreError::EmptyWindow(months));
        }
        let local = now.with_timezone(&calendar_offset());
        let first_month = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)
            .expect("first day of month is valid");
        Ok(Self {
            first_month,
            months,
        })
    }

    /// Creates a window starting at the current month.
    pub fn from_now(months: u32) -> CoreResult<Self> {
        Self::new(calendar_now(), months)
    }

    /// Returns the number of months in the window.
    pub fn months(&self) -> u32 {
        self.months
    }

    /// Returns the first day of the `offset`-th month after the window start.
    fn month_start(&self, offset: u32) -> NaiveDate {
        let index = self.first_month.year() * 12 + self.first_month.month0() as i32 + offset as i32;
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) as u32 + 1;
        NaiveDate::from_ymd_opt(year, month, 1).expect("first day of month is valid")
    }

    /// Returns the anchor date (the 5th) of every month in the window.
    ///
    /// Months roll over into the next year after December.
    pub fn anchor_dates(&self) -> Vec<NaiveDate> {
        (0..self.months)
            .map(|i| {
                self.month_start(i)
                    .with_day(ANCHOR_DAY)
                    .expect("every month has a 5th day")
            })
            .collect()
    }

    /// Returns the month anchors as Unix timestamps at midnight `+08:00`.
    pub fn month_anchors(&self) -> Vec<i64> {
        self.anchor_dates()
            .into_iter()
            .map(|date| at_calendar_offset(date.and_hms_opt(0, 0, 0).expect("midnight")).timestamp())
            .collect()
    }

    /// Lower bound of the calendar query (start of the first month).
    pub fn time_min(&self) -> DateTime<FixedOffset> {
        at_calendar_offset(self.first_month.and_hms_opt(0, 0, 0).expect("midnight"))
    }

    /// Upper bound of the calendar query (start of the month after the window).
    pub fn time_max(&self) -> DateTime<FixedOffset> {
        at_calendar_offset(
            self.month_start(self.months)
                .and_hms_opt(0, 0, 0)
                .expect("midnight"),
        )
    }

    /// Returns `(time_min, time_max)` formatted for the calendar API.
    pub fn query_range(&self) -> (String, String) {
        (
            format_calendar_time(&self.time_min()),
            format_calendar_time(&self.time_max()),
        )
    }
}
