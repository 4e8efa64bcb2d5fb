use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    daemon::storage::{entities::ActivityRecord, record_event::RecordEvent},
    utils::clock::Clock,
};

use super::sampler::DesktopSampler;

/// The sampling loop. Every `interval` it looks at the desktop and forwards a record to the
/// writer when there was some text on the screen.
pub struct ActivityLogger {
    next: mpsc::Sender<RecordEvent>,
    sampler: DesktopSampler,
    shutdown: CancellationToken,
    interval: Duration,
    clock: Box<dyn Clock>,
}

impl ActivityLogger {
    pub fn new(
        next: mpsc::Sender<RecordEvent>,
        sampler: DesktopSampler,
        shutdown: CancellationToken,
        interval: Duration,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            sampler,
            shutdown,
            interval,
            clock,
        }
    }

    /// Runs a single sampling cycle. [None] means the screen had no text worth recording.
    async fn sample_once(&mut self) -> Result<Option<RecordEvent>> {
        let captured_at = self.clock.time();
        let sample = self.sampler.sample().await?;

        match ActivityRecord::from_capture(captured_at, sample.app_name.clone(), &sample.text) {
            Some(record) => Ok(Some(RecordEvent {
                date: captured_at.date_naive(),
                record,
            })),
            None => {
                info!(
                    "[{}] No text detected in {}",
                    captured_at.format("%H:%M:%S"),
                    sample.app_name
                );
                Ok(None)
            }
        }
    }

    /// Executes the sampling loop until the shutdown token is cancelled.
    pub async fn run(mut self) -> Result<()> {
        let mut next_cycle = self.clock.instant();
        loop {
            next_cycle += self.interval;

            match self.sample_once().await {
                Ok(Some(event)) => {
                    let span = info_span!("Forwarding sampled activity");
                    debug!("Sending message {:?}", event);
                    let app_name = event.record.app_name.clone();
                    self.next
                        .send(event)
                        .instrument(span)
                        .await
                        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                    info!("Captured activity in {app_name}")
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        "Sampling cycle failed, retrying in {:?}: {e:?}",
                        self.interval
                    )
                }
            }

            // Cycles that overran their slot don't get replayed, the loop just waits for the
            // next boundary.
            let now = self.clock.instant();
            while next_cycle <= now {
                next_cycle += self.interval;
            }

            tokio::select! {
                biased;
                // Cancelation means we stop execution of the event loop. Which means we also drop
                // the sender channel and consequently stop processing module.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(next_cycle) => ()
            }
        }
    }
}
