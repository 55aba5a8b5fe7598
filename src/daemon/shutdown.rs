use tokio::select;
use tokio_util::sync::CancellationToken;

/// Detects signals sent to the process, or anyone else cancelling first (the browser closing our
/// stdin, for example).
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Can't listen for ctrl-c {e:?}");
                cancelation.cancelled().await;
                return;
            }
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
