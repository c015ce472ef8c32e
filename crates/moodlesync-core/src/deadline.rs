//! Localized deadline parsing.
//!
//! The site renders due dates as `2024年 8月 5日 (一) 23:59`, optionally
//! followed by extra text. [`parse_deadline`] turns that into the canonical
//! `2024-8-5T23:59:00` form. No offset is attached here; the calendar layer
//! supplies it.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::debug;

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)年\s*(\d{1,2})月\s*(\d{1,2})日.*\)\s*(\d{1,2}):(\d{1,2})")
        .expect("valid deadline pattern")
});

/// Converts a localized deadline string into `Y-M-DTHH:MM:00`.
///
/// Month and day keep the site's unpadded digits. When the text does not
/// match the expected shape the input is returned unchanged; callers must
/// not treat an unchanged result as success.
pub fn parse_deadline(text: &str) -> String {
    match DEADLINE_RE.captures(text) {
        Some(caps) => format!(
            "{}-{}-{}T{}:{}:00",
            &caps[1], &caps[2], &caps[3], &caps[4], &caps[5]
        ),
        None => {
            debug!(text, "deadline did not match the localized pattern");
            text.to_string()
        }
    }
}

/// Canonical deadline layouts, with and without seconds.
const DEADLINE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parses a canonical deadline (padded or not) into a naive datetime.
///
/// Returns `None` for anything else, including strings [`parse_deadline`]
/// passed through unchanged.
pub fn deadline_datetime(deadline: &str) -> Option<NaiveDateTime> {
    let deadline = deadline.trim();
    DEADLINE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(deadline, format).ok())
}
