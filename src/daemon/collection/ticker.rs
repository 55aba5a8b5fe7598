use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{daemon::tracker::TrackerHandle, utils::clock::Clock};

/// Drives the periodic work of the tracker: reconciliation ticks and checkpoints. It only queues
/// tasks, the tracker decides what they mean.
pub struct TickerModule {
    tracker: TrackerHandle,
    shutdown: CancellationToken,
    tick_interval: Duration,
    persist_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl TickerModule {
    pub fn new(
        tracker: TrackerHandle,
        shutdown: CancellationToken,
        tick_interval: Duration,
        persist_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            tracker,
            shutdown,
            tick_interval,
            persist_interval,
            time_provider,
        }
    }

    /// Executes the ticker event loop.
    pub async fn run(self) -> Result<()> {
        let start = self.time_provider.instant();
        let mut tick_point = start + self.tick_interval;
        let mut persist_point = start + self.persist_interval;
        loop {
            tokio::select! {
                // Cancelation stops the loop and drops our tracker handle.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(tick_point) => {
                    tick_point += self.tick_interval;
                    self.tracker
                        .tick()
                        .await
                        .inspect_err(|e| error!("Failed to queue tick {e:?}"))?;
                }
                _ = self.time_provider.sleep_until(persist_point) => {
                    persist_point += self.persist_interval;
                    debug!("Requesting checkpoint");
                    self.tracker
                        .checkpoint()
                        .await
                        .inspect_err(|e| error!("Failed to queue checkpoint {e:?}"))?;
                }
            }
        }
    }
}
