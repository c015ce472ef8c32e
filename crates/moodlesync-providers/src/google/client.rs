//! Google Calendar API client.
//!
//! This module provides [`GoogleCalendarClient`], the Calendar v3
//! implementation of [`CalendarGateway`]. Every request fetches a bearer
//! token from the injected [`CredentialProvider`].

use std::sync::Arc;

use moodlesync_core::{CALENDAR_TIMEZONE, CalendarEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::gateway::{BoxFuture, CalendarGateway, CalendarInfo, EventDraft};

use super::credentials::CredentialProvider;

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const PROVIDER_NAME: &str = "google";

/// Google Calendar API client.
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for GoogleCalendarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GoogleCalendarClient {
    /// Creates a client using `credentials` for every request.
    ///
    /// No request timeout is configured; calls rely on transport defaults.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            ProviderError::internal("failed to build HTTP client")
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })?;

        Ok(Self {
            http_client,
            base_url: CALENDAR_API_BASE.to_string(),
            credentials,
        })
    }

    /// Points the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    /// Sends an authorized request and decodes the JSON body.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ProviderResult<T> {
        let token = self.credentials.access_token().await?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e).with_provider(PROVIDER_NAME))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body).with_provider(PROVIDER_NAME));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e))
                .with_provider(PROVIDER_NAME)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_provider(PROVIDER_NAME)
        })
    }

    async fn fetch_calendars(&self) -> ProviderResult<Vec<CalendarInfo>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: CalendarListResponse = self.send(request).await?;
            calendars.extend(page.items.into_iter().map(CalendarInfo::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = calendars.len(), "listed calendars");
        Ok(calendars)
    }

    async fn insert_calendar(&self, summary: &str, description: &str) -> ProviderResult<String> {
        let url = format!("{}/calendars", self.base_url);
        let body = CalendarBody {
            summary,
            description,
            time_zone: CALENDAR_TIMEZONE,
        };

        let created: CreatedCalendar = self.send(self.http_client.post(&url).json(&body)).await?;
        debug!(calendar_id = %created.id, summary, "created calendar");
        Ok(created.id)
    }

    async fn fetch_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let url = self.events_url(calendar_id);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .query(&[("timeMin", time_min), ("timeMax", time_max)]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: EventListResponse = self.send(request).await?;
            events.extend(page.items.into_iter().filter_map(convert_event));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            count = events.len(),
            calendar_id, time_min, time_max, "fetched calendar events"
        );
        Ok(events)
    }

    async fn write_event(
        &self,
        request: reqwest::RequestBuilder,
        event: &EventDraft,
    ) -> ProviderResult<Option<String>> {
        let body = EventBody::from(event);
        let written: EventLinkResponse = self.send(request.json(&body)).await?;
        Ok(written.html_link)
    }
}

impl CalendarGateway for GoogleCalendarClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(self.fetch_calendars())
    }

    fn create_calendar<'a>(
        &'a self,
        summary: &'a str,
        description: &'a str,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.insert_calendar(summary, description))
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(self.fetch_events(calendar_id, time_min, time_max))
    }

    fn create_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>> {
        Box::pin(async move {
            let request = self.http_client.post(self.events_url(calendar_id));
            self.write_event(request, event).await
        })
    }

    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>> {
        Box::pin(async move {
            let url = format!(
                "{}/{}",
                self.events_url(calendar_id),
                urlencoding::encode(event_id)
            );
            self.write_event(self.http_client.put(url), event).await
        })
    }
}

/// Converts an API event into a [`CalendarEvent`].
fn convert_event(event: ApiEvent) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let Some(id) = event.id else {
        warn!("skipping calendar event without id");
        return None;
    };

    Some(CalendarEvent {
        id,
        title: event.summary.unwrap_or_default(),
        description: event.description,
        start: event.start.and_then(|t| t.date_time),
        end: event.end.and_then(|t| t.date_time),
        color_id: event.color_id,
    })
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    color_id: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTimeBody<'a>,
    end: EventTimeBody<'a>,
    color_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTimeBody<'a> {
    date_time: &'a str,
    time_zone: &'a str,
}

impl<'a> From<&'a EventDraft> for EventBody<'a> {
    fn from(event: &'a EventDraft) -> Self {
        Self {
            summary: &event.title,
            description: &event.description,
            start: EventTimeBody {
                date_time: &event.start,
                time_zone: CALENDAR_TIMEZONE,
            },
            end: EventTimeBody {
                date_time: &event.end,
                time_zone: CALENDAR_TIMEZONE,
            },
            color_id: &event.color_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventLinkResponse {
    html_link: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarBody<'a> {
    summary: &'a str,
    description: &'a str,
    time_zone: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedCalendar {
    id: String,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    #[serde(default)]
    summary: String,
    description: Option<String>,
    #[serde(default)]
    primary: bool,
    time_zone: Option<String>,
}

impl From<CalendarListEntry> for CalendarInfo {
    fn from(entry: CalendarListEntry) -> Self {
        Self {
            id: entry.id,
            summary: entry.summary,
            description: entry.description,
            primary: entry.primary,
            time_zone: entry.time_zone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::StaticToken;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleCalendarClient {
        GoogleCalendarClient::new(Arc::new(StaticToken::new("test-token")))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn draft() -> EventDraft {
        EventDraft {
            title: "HW1".to_string(),
            start: "2024-08-05T23:59:00+08:00".to_string(),
            end: "2024-08-05T23:59:00+08:00".to_string(),
            description: "<div id=\"intro\">x</div>".to_string(),
            color_id: "11".to_string(),
        }
    }

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "HW1",
                    "description": "intro",
                    "colorId": "11",
                    "start": {"dateTime": "2024-08-05T23:59:00+08:00", "timeZone": "Asia/Taipei"},
                    "end": {"dateTime": "2024-08-05T23:59:00+08:00", "timeZone": "Asia/Taipei"},
                    "status": "confirmed"
                },
                {
                    "id": "event2",
                    "status": "cancelled"
                }
            ]
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        let events: Vec<_> = response.items.into_iter().filter_map(convert_event).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "HW1");
        assert_eq!(events[0].color_id.as_deref(), Some("11"));
        assert_eq!(
            events[0].start.as_deref(),
            Some("2024-08-05T23:59:00+08:00")
        );
    }

    #[test]
    fn event_body_carries_timezone() {
        let draft = draft();
        let body = serde_json::to_value(EventBody::from(&draft)).unwrap();
        assert_eq!(body["summary"], "HW1");
        assert_eq!(body["colorId"], "11");
        assert_eq!(body["start"]["timeZone"], "Asia/Taipei");
        assert_eq!(body["start"]["dateTime"], body["end"]["dateTime"]);
    }

    #[tokio::test]
    async fn list_events_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/cal%401/events"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "b", "summary": "HW2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/cal%401/events"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("timeMin", "2024-08-01T00:00:00+08:00"))
            .and(query_param("timeMax", "2024-10-01T00:00:00+08:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "a", "summary": "HW1"}],
                "nextPageToken": "p2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = client(&server)
            .list_events(
                "cal@1",
                "2024-08-01T00:00:00+08:00",
                "2024-10-01T00:00:00+08:00",
            )
            .await
            .unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn create_event_posts_body_and_returns_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/cal-1/events"))
            .and(body_partial_json(serde_json::json!({
                "summary": "HW1",
                "colorId": "11",
                "start": {"dateTime": "2024-08-05T23:59:00+08:00", "timeZone": "Asia/Taipei"},
                "end": {"dateTime": "2024-08-05T23:59:00+08:00", "timeZone": "Asia/Taipei"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "new",
                "htmlLink": "https://calendar.example/event?eid=new"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let link = client(&server).create_event("cal-1", &draft()).await.unwrap();
        assert_eq!(link.as_deref(), Some("https://calendar.example/event?eid=new"));
    }

    #[tokio::test]
    async fn update_event_puts_to_event_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/calendars/cal-1/events/evt-9"))
            .and(body_partial_json(serde_json::json!({"description": "<div id=\"intro\">x</div>"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "evt-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let link = client(&server)
            .update_event("cal-1", "evt-9", &draft())
            .await
            .unwrap();
        assert!(link.is_none());
    }

    #[tokio::test]
    async fn create_calendar_sends_timezone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Moodle Deadline",
                "description": "Deadline from Moodle",
                "timeZone": "Asia/Taipei"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "cal-new"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .create_calendar("Moodle Deadline", "Deadline from Moodle")
            .await
            .unwrap();
        assert_eq!(id, "cal-new");
    }

    #[tokio::test]
    async fn list_calendars_maps_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": "primary-id", "summary": "me@example.com", "primary": true},
                    {"id": "cal-1", "summary": "Moodle Deadline", "timeZone": "Asia/Taipei"}
                ]
            })))
            .mount(&server)
            .await;

        let calendars = client(&server).list_calendars().await.unwrap();
        assert_eq!(calendars.len(), 2);
        assert!(calendars[0].primary);
        assert_eq!(calendars[1].summary, "Moodle Deadline");
        assert_eq!(calendars[1].time_zone.as_deref(), Some("Asia/Taipei"));
    }

    #[tokio::test]
    async fn api_errors_propagate_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).list_calendars().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.provider(), Some("google"));
    }
}
