use anyhow::Result;
use tracing::info;

use crate::daemon::storage::{log_store::LogStore, record_event::RecordEvent};

use super::module::EventProcessor;

/// Bridges [ProcessingModule](super::ProcessingModule) and [LogStore]: every event becomes
/// exactly one appended line in the partition of the day it was captured on.
pub struct PartitionWriter<S: LogStore> {
    store: S,
    written: usize,
}

impl<S: LogStore> PartitionWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store, written: 0 }
    }
}

impl<S: LogStore> EventProcessor for PartitionWriter<S> {
    async fn process_next(&mut self, message: RecordEvent) -> Result<()> {
        self.store.append(message.date, &message.record).await?;
        self.written += 1;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        info!("Stopped writing after {} records", self.written);
        Ok(())
    }
}
