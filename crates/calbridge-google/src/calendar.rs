//! Google Calendar API client.
//!
//! A thin, typed reqwest wrapper over the Calendar API v3. Event bodies are
//! forwarded as-is; this module does not interpret calendar semantics beyond
//! decoding the wire format.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GoogleError, GoogleResult};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
///
/// Holds a single access token; the session constructs a client with a
/// valid token before each batch of calls.
#[derive(Debug)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl CalendarClient {
    /// Creates a new client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GoogleError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: CALENDAR_API_BASE.to_string(),
            access_token: access_token.into(),
        })
    }

    /// Overrides the API base URL. Tests point this at a stub server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// Lists the calendars visible to the authorized user.
    pub async fn list_calendars(&self) -> GoogleResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let list: CalendarListResponse = decode_response(response).await?;
        Ok(list.items)
    }

    /// Lists events from a calendar.
    pub async fn list_events(&self, calendar_id: &str) -> GoogleResult<Vec<Event>> {
        let response = self
            .http_client
            .get(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .query(&[("singleEvents", "true"), ("orderBy", "startTime")])
            .send()
            .await
            .map_err(map_transport_error)?;

        let list: EventListResponse = decode_response(response).await?;
        debug!(
            "fetched {} events from calendar {}",
            list.items.len(),
            calendar_id
        );
        Ok(list.items)
    }

    /// Fetches a single event.
    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> GoogleResult<Event> {
        let response = self
            .http_client
            .get(self.event_url(calendar_id, event_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        decode_response(response).await
    }

    /// Inserts a new event into a calendar.
    pub async fn insert_event(&self, calendar_id: &str, event: &Event) -> GoogleResult<Event> {
        let response = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .json(event)
            .send()
            .await
            .map_err(map_transport_error)?;

        let created: Event = decode_response(response).await?;
        debug!(
            "inserted event {} into calendar {}",
            created.id.as_deref().unwrap_or("<unknown>"),
            calendar_id
        );
        Ok(created)
    }

    /// Applies a partial update to an event. Unset fields are left unchanged.
    pub async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &Event,
    ) -> GoogleResult<Event> {
        let response = self
            .http_client
            .patch(self.event_url(calendar_id, event_id))
            .bearer_auth(&self.access_token)
            .json(patch)
            .send()
            .await
            .map_err(map_transport_error)?;

        decode_response(response).await
    }

    /// Deletes an event from a calendar.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> GoogleResult<()> {
        let response = self
            .http_client
            .delete(self.event_url(calendar_id, event_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        check_status(response).await?;
        debug!("deleted event {} from calendar {}", event_id, calendar_id);
        Ok(())
    }
}

fn map_transport_error(e: reqwest::Error) -> GoogleError {
    if e.is_timeout() {
        GoogleError::network("request timeout")
    } else if e.is_connect() {
        GoogleError::network(format!("connection failed: {}", e))
    } else {
        GoogleError::network(format!("request failed: {}", e))
    }
}

/// Maps error statuses; returns the response untouched on success.
async fn check_status(response: reqwest::Response) -> GoogleResult<reqwest::Response> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleError::unauthenticated(
            "access token expired or invalid",
        ));
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(GoogleError::not_found("calendar or event not found"));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(GoogleError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GoogleError::api(format!(
            "calendar API error ({}): {}",
            status, body
        )));
    }

    Ok(response)
}

async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> GoogleResult<T> {
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| GoogleError::invalid_response(format!("failed to parse response: {}", e)))
}

/// A calendar event, as serialized on the wire.
///
/// Every field is optional: the same shape serves as an insert body, a
/// patch body (unset fields untouched), and a decoded response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// The event identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-text location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Event start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    /// Event end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    /// Recurrence rules (RRULE lines).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    /// Event status ("confirmed", "tentative", "cancelled").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Link to the event in the Google Calendar UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// An event boundary: either a timed instant or an all-day date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    /// RFC 3339 timestamp for timed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// `YYYY-MM-DD` date for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// IANA time zone name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar ID.
    pub id: String,
    /// The calendar summary (name).
    pub summary: String,
    /// The calendar description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this is the primary calendar.
    #[serde(default)]
    pub primary: bool,
    /// The calendar timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    items: Vec<Event>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn stubbed_client(server: &MockServer) -> CalendarClient {
        CalendarClient::new("t1", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn sample_event_json() -> serde_json::Value {
        serde_json::json!({
            "id": "event1",
            "summary": "Team sync",
            "start": { "dateTime": "2024-03-15T10:00:00-07:00", "timeZone": "America/Los_Angeles" },
            "end": { "dateTime": "2024-03-15T11:00:00-07:00", "timeZone": "America/Los_Angeles" },
            "status": "confirmed"
        })
    }

    #[test]
    fn event_parses_wire_payload() {
        let event: Event = serde_json::from_value(sample_event_json()).unwrap();
        assert_eq!(event.id.as_deref(), Some("event1"));
        assert_eq!(event.summary.as_deref(), Some("Team sync"));
        assert_eq!(
            event.start.as_ref().unwrap().date_time.as_deref(),
            Some("2024-03-15T10:00:00-07:00")
        );
    }

    #[test]
    fn event_serialization_skips_unset_fields() {
        let event = Event {
            summary: Some("Updated title".to_string()),
            ..Event::default()
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "summary": "Updated title" }));
    }

    #[test]
    fn all_day_event_parses() {
        let json = serde_json::json!({
            "id": "event1",
            "summary": "Offsite",
            "start": { "date": "2024-03-15" },
            "end": { "date": "2024-03-16" }
        });
        let event: Event = serde_json::from_value(json).unwrap();
        assert_eq!(event.start.unwrap().date.as_deref(), Some("2024-03-15"));
    }

    #[tokio::test]
    async fn list_events_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [sample_event_json()]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let events = client.list_events("primary").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("Team sync"));
    }

    #[tokio::test]
    async fn list_calendars_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "primary", "summary": "My Calendar", "primary": true, "timeZone": "America/New_York" },
                    { "id": "work@example.com", "summary": "Work" }
                ]
            })))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let calendars = client.list_calendars().await.unwrap();
        assert_eq!(calendars.len(), 2);
        assert!(calendars[0].primary);
        assert!(!calendars[1].primary);
    }

    #[tokio::test]
    async fn insert_event_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_event_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let event: Event = serde_json::from_value(sample_event_json()).unwrap();
        let created = client.insert_event("primary", &event).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("event1"));
    }

    #[tokio::test]
    async fn patch_event_uses_patch_method() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/calendars/primary/events/event1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_event_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let patch = Event {
            summary: Some("Renamed".to_string()),
            ..Event::default()
        };
        assert!(client.patch_event("primary", "event1", &patch).await.is_ok());
    }

    #[tokio::test]
    async fn delete_event_tolerates_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/event1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        assert!(client.delete_event("primary", "event1").await.is_ok());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let err = client.list_events("primary").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn missing_event_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let err = client.get_event("primary", "nope").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn rate_limit_surfaces_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let client = stubbed_client(&server);
        let err = client.list_events("primary").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::RateLimited);
        assert!(err.message().contains("30"));
    }
}
