//! Month-view and assignment-page crawler.

use moodlesync_core::{AssignmentRecord, SyncWindow};
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::gateway::BoxFuture;
use crate::source::{AssignmentSource, ScrapePolicy};

use super::extract;
use super::session::MoodleSession;

const CALENDAR_PATH: &str = "calendar/view.php";

/// Crawls assignments through an authenticated [`MoodleSession`].
#[derive(Debug, Clone)]
pub struct MoodleCrawler {
    session: MoodleSession,
}

impl MoodleCrawler {
    /// Creates a crawler on top of an authenticated session.
    pub fn new(session: MoodleSession) -> Self {
        Self { session }
    }

    /// Returns the underlying session.
    pub fn session(&self) -> &MoodleSession {
        &self.session
    }

    /// Builds the month-view URL for a month anchor.
    pub fn calendar_url(&self, timestamp: i64) -> ProviderResult<Url> {
        let mut url = self.session.url(CALENDAR_PATH)?;
        url.query_pairs_mut()
            .append_pair("view", "month")
            .append_pair("time", &timestamp.to_string());
        Ok(url)
    }

    /// Crawls the assignments of the next `months` months, starting with
    /// the current one.
    pub async fn assignments_for_next_months(
        &self,
        months: u32,
    ) -> ProviderResult<Vec<AssignmentRecord>> {
        let window = SyncWindow::from_now(months)
            .map_err(|e| ProviderError::configuration(e.to_string()).with_source(e))?;
        let outcome = self
            .assignments_in_window(&window, ScrapePolicy::Abort)
            .await?;
        Ok(outcome.records)
    }

    fn resolve(&self, href: &str) -> String {
        self.session
            .base_url()
            .join(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string())
    }

    async fn collect_urls(&self, month_anchors: &[i64]) -> ProviderResult<Vec<String>> {
        let mut urls = Vec::new();
        for &timestamp in month_anchors {
            let page = self.session.get_page(self.calendar_url(timestamp)?).await?;
            let found = extract::assignment_links(&page);
            debug!(timestamp, count = found.len(), "scanned month view");
            urls.extend(found.iter().map(|href| self.resolve(href)));
        }
        info!(count = urls.len(), "found assignment urls");
        Ok(urls)
    }

    async fn fetch(&self, url: &str) -> ProviderResult<AssignmentRecord> {
        let parsed = Url::parse(url).map_err(|e| {
            ProviderError::invalid_response(format!("invalid assignment url '{}': {}", url, e))
                .with_provider("moodle")
        })?;
        let page = self.session.get_page(parsed).await?;
        extract::parse_assignment(&page).map_err(|e| {
            let message = format!("{} ({})", e.message(), url);
            ProviderError::new(e.code(), message).with_provider("moodle")
        })
    }
}

impl AssignmentSource for MoodleCrawler {
    fn name(&self) -> &str {
        "moodle"
    }

    fn list_assignment_urls<'a>(
        &'a self,
        month_anchors: &'a [i64],
    ) -> BoxFuture<'a, ProviderResult<Vec<String>>> {
        Box::pin(self.collect_urls(month_anchors))
    }

    fn fetch_assignment<'a>(
        &'a self,
        url: &'a str,
    ) -> BoxFuture<'a, ProviderResult<AssignmentRecord>> {
        Box::pin(self.fetch(url))
    }
}
