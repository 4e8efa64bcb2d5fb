use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use collection::{
    collector::ActivityLogger, sampler::DesktopSampler, screen::CommandScreenReader,
};
use processing::{partition_writer::PartitionWriter, ProcessingModule};
use storage::{log_store::LogStoreImpl, record_event::RecordEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::AppConfig,
    utils::clock::{Clock, DefaultClock},
    window_api::{ForegroundApp, GenericForegroundApp, UnsupportedForegroundApp},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

pub const RECORD_DIR_NAME: &str = "records";

/// Represents the starting point for the activity logger. Returns once the process has been
/// asked to stop and every captured record has been written.
pub async fn start_daemon(dir: PathBuf, config: AppConfig) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<RecordEvent>(10);

    let foreground: Box<dyn ForegroundApp> = match GenericForegroundApp::new() {
        Ok(v) => Box::new(v),
        Err(e) => {
            warn!("Foreground application detection is unavailable {e:?}");
            Box::new(UnsupportedForegroundApp)
        }
    };
    let sampler = DesktopSampler::new(
        foreground,
        Box::new(CommandScreenReader::new(&config.capture)),
    );

    let shutdown_token = CancellationToken::new();

    let logger = create_logger(
        sender,
        sampler,
        &shutdown_token,
        config.sampling.interval(),
        DefaultClock,
    );

    let processor = create_processor(dir.join(RECORD_DIR_NAME), receiver)?;

    info!(
        "Recording activity every {:?} into {:?}",
        config.sampling.interval(),
        dir.join(RECORD_DIR_NAME)
    );

    let (_, collection_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = logger.run().await;
            shutdown_token.cancel();
            result
        },
        processor.run(),
    );

    if let Err(collection_result) = collection_result {
        error!("Activity logger got an error {:?}", collection_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    info!("Activity logger stopped");
    Ok(())
}

fn create_logger(
    sender: mpsc::Sender<RecordEvent>,
    sampler: DesktopSampler,
    shutdown_token: &CancellationToken,
    interval: Duration,
    clock: impl Clock,
) -> ActivityLogger {
    ActivityLogger::new(
        sender,
        sampler,
        shutdown_token.clone(),
        interval,
        Box::new(clock),
    )
}

fn create_processor(
    record_dir: PathBuf,
    receiver: mpsc::Receiver<RecordEvent>,
) -> Result<ProcessingModule<PartitionWriter<LogStoreImpl>>, anyhow::Error> {
    let storage = LogStoreImpl::new(record_dir)?;
    let writer = PartitionWriter::new(storage);
    Ok(ProcessingModule::new(receiver, writer))
}
