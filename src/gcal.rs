use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clock::TimeAuthority;
use crate::config::CalendarSettings;
use crate::limits::MAX_BUSY_INTERVALS;
use crate::model::{BusyInterval, Span, Stamp};
use crate::source::{BusyIntervalSource, SourceError};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

const FALLBACK_ERROR: &str = "Unable to load calendar.";

// ── Wire shapes (every field optional) ─────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: Option<String>,
    status: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Busy intervals from a Google Calendar `events.list` call.
///
/// All the defensive handling of the loosely shaped event payload lives
/// here; events without a usable start and end are skipped.
pub struct GoogleCalendarSource {
    client: reqwest::Client,
    base_url: String,
    calendar_id: String,
    api_key: Option<String>,
    authority: TimeAuthority,
}

impl GoogleCalendarSource {
    pub fn new(settings: &CalendarSettings, authority: TimeAuthority) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SourceError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            calendar_id: settings.calendar_id.clone(),
            api_key: settings.api_key.clone(),
            authority,
        })
    }

    fn events_url(&self) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SourceError::Unavailable(format!("bad calendar url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Unavailable("calendar url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }

    fn resolve(&self, t: &EventTime) -> Option<Stamp> {
        if let Some(s) = &t.date_time {
            return DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| self.authority.to_local(dt));
        }
        let date = NaiveDate::parse_from_str(t.date.as_deref()?, "%Y-%m-%d").ok()?;
        Some(self.authority.start_of_date(date))
    }

    fn busy_interval(&self, event: &Event) -> Option<BusyInterval> {
        if event.status.as_deref() == Some("cancelled") {
            return None;
        }
        let start = self.resolve(event.start.as_ref()?);
        let end = self.resolve(event.end.as_ref()?);
        let span = start.zip(end).and_then(|(s, e)| Span::checked(s, e));
        if span.is_none() {
            warn!(event = event.id.as_deref().unwrap_or("?"), "skipping event without usable times");
        }
        span
    }
}

#[async_trait]
impl BusyIntervalSource for GoogleCalendarSource {
    async fn fetch_busy(&self, range: Span) -> Result<Vec<BusyInterval>, SourceError> {
        let mut params: Vec<(&str, String)> = vec![
            ("timeMin", self.authority.to_rfc3339(range.start)),
            ("timeMax", self.authority.to_rfc3339(range.end)),
            ("showDeleted", "false".into()),
            ("singleEvents", "true".into()),
            ("orderBy", "startTime".into()),
            ("maxResults", MAX_BUSY_INTERVALS.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(self.events_url()?)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|env| env.error)
                .and_then(|err| err.message)
                .unwrap_or_else(|| FALLBACK_ERROR.to_string());
            return Err(SourceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let list: EventList = response.json().await.map_err(|e| {
            if e.is_decode() {
                SourceError::Malformed(e.to_string())
            } else {
                SourceError::Unavailable(e.to_string())
            }
        })?;
        if list.next_page_token.is_some() {
            warn!(limit = MAX_BUSY_INTERVALS, "calendar returned more events than one page; extra pages ignored");
        }

        let busy: Vec<BusyInterval> = list
            .items
            .iter()
            .filter_map(|e| self.busy_interval(e))
            .collect();
        debug!(events = list.items.len(), busy = busy.len(), "calendar events fetched");
        Ok(busy)
    }
}
