use async_trait::async_trait;
use chrono::NaiveDate;

/// A scheduled event as shown in the prompt. `start` is already rendered, either `HH:MM` or a
/// date for all-day events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub start: String,
    pub title: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("not authorized, no token at {0}")]
    NotAuthorized(String),
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("calendar is disabled")]
    Disabled,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("calendar service answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("token file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed token: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Source of the day's scheduled events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events of the local day `date`, ordered by start time.
    async fn get_events(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, CalendarError>;
}

/// Used when the calendar is turned off in the configuration.
pub struct DisabledCalendar;

#[async_trait]
impl CalendarProvider for DisabledCalendar {
    async fn get_events(&self, _date: NaiveDate) -> Result<Vec<CalendarEvent>, CalendarError> {
        Err(CalendarError::Disabled)
    }
}
