use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Upper bound on the stored summary, in characters.
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Application name used when the foreground application can't be determined.
pub const UNKNOWN_APP: &str = "Unknown";

/// One observation of the desktop. This is exactly what is written as a line of a partition
/// file, so changing it changes the on-disk format.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct ActivityRecord {
    #[serde(with = "timestamp_ser")]
    pub timestamp: NaiveTime,
    pub app_name: Arc<str>,
    pub text_summary: Arc<str>,
}

impl ActivityRecord {
    /// Builds a record out of raw recognized text. Returns [None] when there is nothing worth
    /// recording.
    pub fn from_capture(
        captured_at: DateTime<Local>,
        app_name: Arc<str>,
        text: &str,
    ) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let text_summary = normalize_summary(text);
        Some(Self {
            timestamp: captured_at.time().with_nanosecond(0).unwrap_or(captured_at.time()),
            app_name,
            text_summary: text_summary.into(),
        })
    }
}

/// Collapses line breaks into spaces and caps the text at [MAX_SUMMARY_CHARS] characters, so
/// that a summary always fits on one line of a partition.
pub fn normalize_summary(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(MAX_SUMMARY_CHARS)
        .collect()
}

mod timestamp_ser {
    use chrono::NaiveTime;
    use serde::{self, de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M:%S";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(de::Error::custom)
    }
}
