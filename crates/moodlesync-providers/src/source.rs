//! AssignmentSource trait definition.
//!
//! The engine never touches HTML. It asks an [`AssignmentSource`] for the
//! assignment URLs of some months and then for one record per URL, so the
//! scrape strategy can change without touching reconciliation.

use moodlesync_core::{AssignmentRecord, SyncWindow};
use tracing::{info, warn};

use crate::error::ProviderResult;
use crate::gateway::BoxFuture;

/// What a window crawl does with a page missing a required element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrapePolicy {
    /// The first unparsable page aborts the crawl.
    #[default]
    Abort,
    /// Unparsable pages are logged and left out. Transport and
    /// authentication failures still abort.
    Skip,
}

/// Records of one window crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutcome {
    /// Parsed records in discovery order.
    pub records: Vec<AssignmentRecord>,
    /// URLs left out under [`ScrapePolicy::Skip`].
    pub skipped: Vec<String>,
}

/// A place assignments are crawled from.
pub trait AssignmentSource: Send + Sync {
    /// Returns the name of this source (e.g. "moodle").
    fn name(&self) -> &str;

    /// Collects assignment URLs from the month views of `month_anchors`.
    ///
    /// Anchors are processed in order and URLs keep discovery order.
    /// Duplicates across months are kept.
    fn list_assignment_urls<'a>(
        &'a self,
        month_anchors: &'a [i64],
    ) -> BoxFuture<'a, ProviderResult<Vec<String>>>;

    /// Fetches one assignment page and extracts its record.
    fn fetch_assignment<'a>(&'a self, url: &'a str)
    -> BoxFuture<'a, ProviderResult<AssignmentRecord>>;

    /// Crawls every assignment in `window`, one page at a time.
    ///
    /// Any failure aborts the crawl, except scrape-structure failures under
    /// [`ScrapePolicy::Skip`].
    fn assignments_in_window<'a>(
        &'a self,
        window: &'a SyncWindow,
        policy: ScrapePolicy,
    ) -> BoxFuture<'a, ProviderResult<CrawlOutcome>> {
        Box::pin(async move {
            let anchors = window.month_anchors();
            let urls = self.list_assignment_urls(&anchors).await?;
            let mut outcome = CrawlOutcome {
                records: Vec::with_capacity(urls.len()),
                skipped: Vec::new(),
            };
            for url in urls {
                match self.fetch_assignment(&url).await {
                    Ok(record) => outcome.records.push(record),
                    Err(e) if policy == ScrapePolicy::Skip && e.is_scrape_structure() => {
                        warn!(%url, error = %e, "skipping unparsable assignment");
                        outcome.skipped.push(url);
                    }
                    Err(e) => return Err(e),
                }
            }
            info!(
                count = outcome.records.len(),
                skipped = outcome.skipped.len(),
                months = window.months(),
                "crawled assignments"
            );
            Ok(outcome)
        })
    }
}
