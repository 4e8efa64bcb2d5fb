use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use super::storage::record_event::RecordEvent;

pub mod module;
pub mod partition_writer;

/// Receiving end of the sampling loop. Hands every record to a processor and keeps going when
/// one of them can't be stored.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<RecordEvent>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<RecordEvent>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    /// Runs until the sender side is dropped, then drains what is left in the channel.
    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.receiver.recv().await {
            debug!("Processing event {:?}", event);
            let (date, timestamp) = (event.date, event.record.timestamp);
            match self.processor.process_next(event).await {
                Ok(_) => {
                    info!("Stored record {date} {timestamp}")
                }
                Err(e) => {
                    error!("Error storing record {date} {timestamp}: {e:?}")
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
