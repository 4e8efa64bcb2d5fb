use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::time::Instant;

/// Supplies wall-clock time, monotonic instants and sleeping to the sampling loop, so that the
/// loop can be driven by a fake clock in tests.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    /// Local wall-clock time. Partitions and record timestamps are derived from it.
    fn time(&self) -> DateTime<Local>;

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

