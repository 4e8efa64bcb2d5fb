//! Google Calendar backed [CalendarProvider]. Authorization itself happens elsewhere; this
//! only reuses a `token.json` written by Google's client libraries, refreshing it when needed.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::calendar::{CalendarError, CalendarEvent, CalendarProvider};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
pub(super) const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const NO_TITLE: &str = "No Title";

/// Tokens are refreshed a little before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Contents of `token.json`. Unknown keys are carried over untouched when the file is
/// rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredToken {
    pub async fn save(&self, path: &Path) -> Result<(), CalendarError> {
        tokio::fs::write(path, serde_json::to_string_pretty(self)?).await?;
        debug!("Saved calendar token to {path:?}");
        Ok(())
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expiry)) => expiry - TimeDelta::seconds(EXPIRY_MARGIN_SECS) > now,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    summary: Option<String>,
    start: Option<EventTime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    /// `HH:MM` in the event's own offset for timed events, the bare date for all-day ones.
    fn render(&self) -> String {
        if let Some(date_time) = &self.date_time {
            return match DateTime::parse_from_rfc3339(date_time) {
                Ok(parsed) => parsed.format("%H:%M").to_string(),
                Err(_) => date_time.clone(),
            };
        }
        self.date.clone().unwrap_or_default()
    }
}

impl From<EventItem> for CalendarEvent {
    fn from(item: EventItem) -> Self {
        Self {
            start: item.start.unwrap_or_default().render(),
            title: item
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NO_TITLE.to_string()),
        }
    }
}

pub struct GoogleCalendar {
    client: Client,
    token_path: PathBuf,
    calendar_id: String,
}

impl GoogleCalendar {
    pub fn new(token_path: PathBuf, calendar_id: String) -> Result<Self, CalendarError> {
        Ok(Self {
            client: http_client()?,
            token_path,
            calendar_id,
        })
    }

    async fn load_token(&self) -> Result<StoredToken, CalendarError> {
        match tokio::fs::read_to_string(&self.token_path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                CalendarError::NotAuthorized(self.token_path.display().to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns a usable access token, refreshing and persisting it when it has expired.
    async fn access_token(&self) -> Result<String, CalendarError> {
        let mut token = self.load_token().await?;
        if token.is_usable(Utc::now()) {
            if let Some(access) = token.token {
                return Ok(access);
            }
        }

        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            token.refresh_token.clone(),
            token.client_id.clone(),
            token.client_secret.clone(),
        ) else {
            return Err(CalendarError::NotAuthorized(
                self.token_path.display().to_string(),
            ));
        };

        info!("Refreshing calendar access token");
        let token_uri = token
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
        let response = self
            .client
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;
        let refreshed: RefreshResponse = check_status(response).await?.json().await?;

        token.token = Some(refreshed.access_token.clone());
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + TimeDelta::seconds(secs));
        token.save(&self.token_path).await?;

        Ok(refreshed.access_token)
    }

    fn events_url(&self) -> Result<Url, CalendarError> {
        let mut url =
            Url::parse(API_BASE).map_err(|e| CalendarError::Other(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Other("calendar API url can't have segments".into()))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }
}

pub(super) fn http_client() -> Result<Client, CalendarError> {
    Ok(Client::builder().timeout(Duration::from_secs(30)).build()?)
}

fn day_bounds(date: NaiveDate) -> Result<(DateTime<Local>, DateTime<Local>), CalendarError> {
    let start_of = |day: NaiveDate| {
        day.and_time(NaiveTime::MIN)
            .and_local_timezone(Local)
            .earliest()
            .ok_or_else(|| CalendarError::Other(format!("{day} has no local midnight")))
    };
    let next = date
        .succ_opt()
        .ok_or_else(|| CalendarError::Other(format!("{date} has no following day")))?;
    Ok((start_of(date)?, start_of(next)?))
}

pub(super) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CalendarError::Status { status, body })
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    #[instrument(skip(self))]
    async fn get_events(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, CalendarError> {
        let access_token = self.access_token().await?;
        let (time_min, time_max) = day_bounds(date)?;

        let response = self
            .client
            .get(self.events_url()?)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;
        let list: EventList = check_status(response).await?.json().await?;

        debug!("Received {} events", list.items.len());
        Ok(list.items.into_iter().map(CalendarEvent::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::report::calendar::{CalendarError, CalendarEvent, CalendarProvider};

    use super::{EventList, GoogleCalendar, StoredToken};

    const TOKEN: &str = r#"{
        "token": "ya29.access",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "id.apps.googleusercontent.com",
        "client_secret": "secret",
        "scopes": ["https://www.googleapis.com/auth/calendar.readonly"],
        "universe_domain": "googleapis.com",
        "expiry": "2025-12-25T10:00:00.123456Z"
    }"#;

    #[test]
    fn test_token_expiry() -> Result<()> {
        let token: StoredToken = serde_json::from_str(TOKEN)?;

        assert!(token.is_usable(Utc.with_ymd_and_hms(2025, 12, 25, 9, 0, 0).unwrap()));
        assert!(!token.is_usable(Utc.with_ymd_and_hms(2025, 12, 25, 9, 59, 30).unwrap()));
        assert!(!token.is_usable(Utc.with_ymd_and_hms(2025, 12, 26, 0, 0, 0).unwrap()));
        Ok(())
    }

    #[test]
    fn test_token_keeps_unknown_keys() -> Result<()> {
        let token: StoredToken = serde_json::from_str(TOKEN)?;
        let written = serde_json::to_value(&token)?;

        assert_eq!(written["universe_domain"], "googleapis.com");
        assert_eq!(written["refresh_token"], "1//refresh");
        Ok(())
    }

    #[test]
    fn test_event_rendering() -> Result<()> {
        let list: EventList = serde_json::from_str(
            r#"{ "items": [
                { "summary": "Standup", "start": { "dateTime": "2025-12-25T10:00:00+09:00" } },
                { "summary": "Holiday", "start": { "date": "2025-12-25" } },
                { "start": { "dateTime": "2025-12-25T13:30:00Z" } }
            ] }"#,
        )?;

        let events = list
            .items
            .into_iter()
            .map(CalendarEvent::from)
            .collect::<Vec<_>>();

        let pairs = events
            .iter()
            .map(|e| (e.start.as_str(), e.title.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![
                ("10:00", "Standup"),
                ("2025-12-25", "Holiday"),
                ("13:30", "No Title")
            ]
        );
        Ok(())
    }

    #[test]
    fn test_events_url_escapes_calendar_id() -> Result<()> {
        let calendar = GoogleCalendar::new(
            "token.json".into(),
            "en.japanese#holiday@group.v.calendar.google.com".into(),
        )?;

        assert_eq!(
            calendar.events_url()?.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/\
             en.japanese%23holiday@group.v.calendar.google.com/events"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_token_is_not_authorized() -> Result<()> {
        let dir = tempdir()?;
        let calendar = GoogleCalendar::new(dir.path().join("token.json"), "primary".into())?;

        let result = calendar
            .get_events(NaiveDate::from_ymd_opt(2025, 12, 25).unwrap())
            .await;

        assert!(matches!(result, Err(CalendarError::NotAuthorized(_))));
        Ok(())
    }
}
