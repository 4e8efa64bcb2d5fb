use std::time::Duration;

use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("condition wasn't met within {0:?}")]
pub struct PollTimeout(pub Duration);

/// Calls `check` every `interval` until it yields a value. Gives up with [PollTimeout] once
/// `limit` has passed.
pub async fn poll_until<T>(
    interval: Duration,
    limit: Duration,
    mut check: impl FnMut() -> Option<T>,
) -> Result<T, PollTimeout> {
    timeout(limit, async {
        loop {
            if let Some(value) = check() {
                return value;
            }
            sleep(interval).await;
        }
    })
    .await
    .map_err(|_| PollTimeout(limit))
}
