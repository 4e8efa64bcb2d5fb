use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::debug;

use crate::daemon::storage::{entities::ActivityRecord, log_store::LogStore};

use super::format::render_listing;

/// How many times an application was captured during a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageStat {
    pub app_name: Arc<str>,
    pub capture_count: usize,
}

/// Everything the report needs to know about a day's partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAggregate {
    /// Chronological timeline, one line per record. Empty when nothing was recorded.
    pub listing: String,
    pub stats: Vec<UsageStat>,
}

impl DayAggregate {
    pub fn from_records(records: &[ActivityRecord]) -> Self {
        Self {
            listing: render_listing(records),
            stats: count_usage(records),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listing.is_empty() && self.stats.is_empty()
    }
}

/// Reads the partition of `date` and aggregates it. Absent and empty partitions both produce
/// an empty aggregate.
pub async fn aggregate(store: &impl LogStore, date: NaiveDate) -> Result<DayAggregate> {
    let Some(records) = store.read(date).await? else {
        debug!("No partition for {date}");
        return Ok(DayAggregate::default());
    };
    Ok(DayAggregate::from_records(&records))
}

/// Counts records per application. Sorted by count descending; applications with equal counts
/// keep the order in which they first appeared.
pub fn count_usage(records: &[ActivityRecord]) -> Vec<UsageStat> {
    let mut positions = HashMap::<Arc<str>, usize>::new();
    let mut stats = Vec::<UsageStat>::new();

    for record in records {
        match positions.get(&record.app_name) {
            Some(&index) => stats[index].capture_count += 1,
            None => {
                positions.insert(record.app_name.clone(), stats.len());
                stats.push(UsageStat {
                    app_name: record.app_name.clone(),
                    capture_count: 1,
                });
            }
        }
    }

    // sort_by is stable, which is what keeps first appearance as the tie breaker.
    stats.sort_by(|a, b| b.capture_count.cmp(&a.capture_count));
    stats
}
