use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Detects signals sent to the process and turns them into cancellation of `cancelation`.
/// Also returns when the token gets cancelled by someone else, so it never outlives the loop.
///
/// On Windows detached processes can't detect signals sent to them, so there only Ctrl-C in a
/// console works.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, stopping after the current cycle");
            cancelation.cancel();
        },
        _ = terminate() => {
            info!("Received termination request, stopping after the current cycle");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!("Couldn't listen for SIGTERM {e:?}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
