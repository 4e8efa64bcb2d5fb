use chrono::NaiveDate;

use super::entities::ActivityRecord;

/// Message passed from the sampling loop to the writer. Carries the partition the record
/// belongs to, since the record itself only knows the time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEvent {
    pub date: NaiveDate,
    pub record: ActivityRecord,
}
