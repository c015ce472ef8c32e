//! HTML extraction for Moodle pages.
//!
//! Pure functions over page source. The site exposes no per-assignment API,
//! so everything here locates data by page structure: label text in a
//! `<th>` followed by its sibling `<td>`. These are the only places that
//! know the page layout.

use std::sync::LazyLock;

use moodlesync_core::{AssignmentRecord, SubmissionStatus, parse_deadline};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Table label of the submission status row.
pub const STATUS_LABEL: &str = "繳交狀態";

/// Table label of the due date row.
pub const DUE_DATE_LABEL: &str = "規定繳交時間";

/// Substring identifying assignment-type event links.
const ASSIGNMENT_MARKER: &str = "assign";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static LOGIN_TOKEN: LazyLock<Selector> = LazyLock::new(|| selector(r#"input[name="logintoken"]"#));
static USER_ID: LazyLock<Selector> = LazyLock::new(|| selector("div.popover-region-notifications"));
static VIEW_EVENT: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[data-action="view-event"]"#));
static MAIN_HEADING: LazyLock<Selector> = LazyLock::new(|| selector(r#"div[role="main"] h2"#));
static INTRO: LazyLock<Selector> = LazyLock::new(|| selector("div#intro"));
static SUBMISSIONS_CLOSED: LazyLock<Selector> =
    LazyLock::new(|| selector("div.submissionsalloweddates"));
static TABLE_HEADER: LazyLock<Selector> = LazyLock::new(|| selector("th"));

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Extracts the login token embedded in the login form.
pub fn login_token(html: &str) -> ProviderResult<String> {
    let document = Html::parse_document(html);
    document
        .select(&LOGIN_TOKEN)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| ProviderError::element_not_found("login token input not found"))
}

/// Extracts the current user's id from the notification popover.
pub fn user_id(html: &str) -> ProviderResult<String> {
    let document = Html::parse_document(html);
    document
        .select(&USER_ID)
        .next()
        .and_then(|popover| popover.value().attr("data-userid"))
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::element_not_found("notification popover with user id not found")
        })
}

/// Returns the `href` of every assignment "view event" link in page order.
pub fn assignment_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&VIEW_EVENT)
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| href.contains(ASSIGNMENT_MARKER))
        .map(str::to_string)
        .collect()
}

/// Finds the `<th>` whose text equals `label`.
///
/// Returns `None` when the row is missing, `Some(None)` when the row has no
/// `<td>` sibling and `Some(Some(text))` otherwise.
fn labeled_cell(document: &Html, label: &str) -> Option<Option<String>> {
    let header = document
        .select(&TABLE_HEADER)
        .find(|th| text_of(*th) == label)?;

    let cell = header
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "td")
        .map(text_of);
    Some(cell)
}

/// Extracts an [`AssignmentRecord`] from an assignment page.
///
/// # Errors
///
/// Returns an `element_not_found` error when the main heading, the status
/// row or the due date (row or value) is missing.
pub fn parse_assignment(html: &str) -> ProviderResult<AssignmentRecord> {
    let document = Html::parse_document(html);

    let title = document
        .select(&MAIN_HEADING)
        .next()
        .map(text_of)
        .ok_or_else(|| ProviderError::element_not_found("assignment heading not found"))?;

    let description = document
        .select(&INTRO)
        .next()
        .map(|intro| intro.html())
        .unwrap_or_default();

    let can_submit = document.select(&SUBMISSIONS_CLOSED).next().is_none();

    let submission_status = match labeled_cell(&document, STATUS_LABEL) {
        None => {
            return Err(ProviderError::element_not_found(format!(
                "submission status row '{}' not found",
                STATUS_LABEL
            )));
        }
        Some(None) => SubmissionStatus::Unknown,
        Some(Some(text)) => SubmissionStatus::classify(&text),
    };

    let due_date = match labeled_cell(&document, DUE_DATE_LABEL) {
        Some(Some(text)) => text,
        _ => {
            return Err(ProviderError::element_not_found(format!(
                "due date row '{}' not found",
                DUE_DATE_LABEL
            )));
        }
    };

    let deadline = parse_deadline(&due_date);
    debug!(%title, %deadline, can_submit, %submission_status, "parsed assignment page");

    Ok(AssignmentRecord {
        title,
        deadline,
        description,
        can_submit,
        submission_status,
    })
}
