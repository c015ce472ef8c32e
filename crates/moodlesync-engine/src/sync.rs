//! Reconciliation of crawled assignments against the deadline calendar.
//!
//! One run resolves the target calendar, crawls the [`SyncWindow`], lists
//! the calendar events covering the same window and then walks the crawled
//! records in order:
//!
//! - no event with the record's title: create one
//! - first event with that title differs: update it
//! - first event with that title already matches: leave it alone
//!
//! Events whose title is no longer crawled are never touched. Every call is
//! awaited in sequence.

use std::collections::HashSet;
use std::fmt;

use moodlesync_core::{AssignmentRecord, CalendarEvent, SyncWindow};
use moodlesync_providers::{EventDraft, ScrapePolicy};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CALENDAR_DESCRIPTION, SyncSettings};
use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::lock::RunLock;

/// Outcome counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Events created for previously unseen titles.
    pub created: usize,
    /// Matched events rewritten because a field differed.
    pub updated: usize,
    /// Matched events already identical to the crawl.
    pub unchanged: usize,
    /// Assignment pages skipped because they could not be parsed.
    pub skipped: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} skipped",
            self.created, self.updated, self.unchanged, self.skipped
        )
    }
}

/// Drives one reconciliation run over a [`SyncContext`].
#[derive(Debug)]
pub struct SyncEngine {
    context: SyncContext,
    calendar_name: String,
    scrape_policy: ScrapePolicy,
}

impl SyncEngine {
    /// Creates an engine writing to `calendar_name`.
    pub fn new(context: SyncContext, calendar_name: impl Into<String>) -> Self {
        Self {
            context,
            calendar_name: calendar_name.into(),
            scrape_policy: ScrapePolicy::Abort,
        }
    }

    /// Builder: skip assignment pages missing a required element instead of
    /// aborting the run.
    pub fn with_skip_unparsable(mut self, skip: bool) -> Self {
        self.scrape_policy = if skip {
            ScrapePolicy::Skip
        } else {
            ScrapePolicy::Abort
        };
        self
    }

    /// Returns the context this engine runs against.
    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Syncs the next `months` months, starting with the current one.
    pub async fn run(&self, months: u32) -> SyncResult<SyncReport> {
        let window = SyncWindow::from_now(months)?;
        self.run_in_window(&window).await
    }

    /// Syncs the given window.
    pub async fn run_in_window(&self, window: &SyncWindow) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        let calendar_id = self.resolve_calendar().await?;
        let records = self.crawl(window, &mut report).await?;
        warn_duplicate_titles(&records);

        let (time_min, time_max) = window.query_range();
        let existing = self
            .context
            .gateway()
            .list_events(&calendar_id, &time_min, &time_max)
            .await?;
        debug!(count = existing.len(), %time_min, %time_max, "listed existing events");

        for record in &records {
            self.reconcile(&calendar_id, record, &existing, &mut report)
                .await?;
        }

        info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "sync finished"
        );
        Ok(report)
    }

    /// Returns the id of the target calendar, creating it when absent.
    async fn resolve_calendar(&self) -> SyncResult<String> {
        let gateway = self.context.gateway();
        let calendars = gateway.list_calendars().await?;
        if let Some(calendar) = calendars.iter().find(|c| c.summary == self.calendar_name) {
            debug!(calendar_id = %calendar.id, "using existing calendar");
            return Ok(calendar.id.clone());
        }

        let id = gateway
            .create_calendar(&self.calendar_name, CALENDAR_DESCRIPTION)
            .await?;
        info!(calendar = %self.calendar_name, calendar_id = %id, "created calendar");
        Ok(id)
    }

    async fn crawl(
        &self,
        window: &SyncWindow,
        report: &mut SyncReport,
    ) -> SyncResult<Vec<AssignmentRecord>> {
        let outcome = self
            .context
            .source()
            .assignments_in_window(window, self.scrape_policy)
            .await?;
        report.skipped = outcome.skipped.len();
        Ok(outcome.records)
    }

    async fn reconcile(
        &self,
        calendar_id: &str,
        record: &AssignmentRecord,
        existing: &[CalendarEvent],
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let gateway = self.context.gateway();

        match existing.iter().find(|event| event.title == record.title) {
            None => {
                let draft = EventDraft::for_assignment(record);
                let link = gateway.create_event(calendar_id, &draft).await?;
                info!(title = %record.title, link = ?link, "created event");
                report.created += 1;
            }
            Some(event) if event.is_identical_to(record) => {
                debug!(title = %record.title, "event up to date");
                report.unchanged += 1;
            }
            Some(event) => {
                let draft = EventDraft::for_assignment(record);
                let link = gateway.update_event(calendar_id, &event.id, &draft).await?;
                info!(title = %record.title, event_id = %event.id, link = ?link, "updated event");
                report.updated += 1;
            }
        }
        Ok(())
    }
}

/// Warns about titles crawled more than once.
///
/// Titles are the only key shared with the calendar, so duplicates all
/// reconcile against the same first matching event.
fn warn_duplicate_titles(records: &[AssignmentRecord]) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for record in records {
        if !seen.insert(record.title.as_str()) && reported.insert(record.title.as_str()) {
            warn!(title = %record.title, "assignment title crawled more than once");
        }
    }
}

/// Runs one full sync with the given settings.
///
/// Holds the calendar's [`RunLock`] for the whole run. The site session and
/// calendar gateway are opened here and released when the run ends.
pub async fn run_sync(settings: &SyncSettings) -> SyncResult<SyncReport> {
    if settings.calendar_name.trim().is_empty() {
        return Err(SyncError::config("calendar_name must not be empty"));
    }
    let _lock = RunLock::acquire(&settings.lock_dir, &settings.calendar_name)?;

    let context = SyncContext::open(settings).await?;
    SyncEngine::new(context, settings.calendar_name.clone())
        .with_skip_unparsable(settings.skip_unparsable_assignments)
        .run(settings.num_of_months)
        .await
}
