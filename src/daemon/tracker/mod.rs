//! Activity tracker and query responder.
//!
//! [TrackerModule] is the only owner of the [TabTable]. Browser events, ticks, checkpoints and
//! snapshot requests reach it as [TrackerTask]s through a single channel and are processed one at
//! a time, so a snapshot always sees whole events. [TrackerHandle] is the cloneable front door.

pub mod error;
pub mod idle;
pub mod record;
pub mod snapshot;
pub mod table;
pub mod task;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use error::TrackerError;
use snapshot::Snapshot;
use table::TabTable;
use task::{BrowserEvent, TrackerTask};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{daemon::storage::entities::StateEntity, utils::clock::Clock};

const TASK_QUEUE_SIZE: usize = 64;
const UPDATE_QUEUE_SIZE: usize = 16;

/// Cloneable access to the tracker worker.
#[derive(Clone)]
pub struct TrackerHandle {
    sender: mpsc::Sender<TrackerTask>,
    updates: broadcast::Sender<Arc<Snapshot>>,
}

impl TrackerHandle {
    async fn send(&self, task: TrackerTask) -> Result<()> {
        self.sender
            .send(task)
            .await
            .map_err(|_| TrackerError::WorkerGone)?;
        Ok(())
    }

    pub async fn dispatch(&self, event: BrowserEvent) -> Result<()> {
        self.send(TrackerTask::Browser(event)).await
    }

    pub async fn tick(&self) -> Result<()> {
        self.send(TrackerTask::Tick).await
    }

    pub async fn checkpoint(&self) -> Result<()> {
        self.send(TrackerTask::Checkpoint).await
    }

    /// Reconciled view of every record. Answered after every task queued before it.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, response) = oneshot::channel();
        self.send(TrackerTask::Snapshot(reply)).await?;
        Ok(response.await.map_err(|_| TrackerError::WorkerGone)?)
    }

    /// Snapshots pushed after every tick.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.updates.subscribe()
    }
}

/// Worker owning the table.
pub struct TrackerModule {
    receiver: mpsc::Receiver<TrackerTask>,
    table: TabTable,
    updates: broadcast::Sender<Arc<Snapshot>>,
    checkpoints: mpsc::Sender<StateEntity>,
    shutdown: CancellationToken,
    time_provider: Box<dyn Clock>,
}

impl TrackerModule {
    pub fn new(
        table: TabTable,
        checkpoints: mpsc::Sender<StateEntity>,
        shutdown: CancellationToken,
        time_provider: Box<dyn Clock>,
    ) -> (Self, TrackerHandle) {
        let (sender, receiver) = mpsc::channel(TASK_QUEUE_SIZE);
        let (updates, _) = broadcast::channel(UPDATE_QUEUE_SIZE);
        let handle = TrackerHandle {
            sender,
            updates: updates.clone(),
        };
        (
            Self {
                receiver,
                table,
                updates,
                checkpoints,
                shutdown,
                time_provider,
            },
            handle,
        )
    }

    fn process(&mut self, task: TrackerTask) {
        let now = self.time_provider.time();
        match task {
            TrackerTask::Browser(event) => {
                trace!("Applying {:?}", event);
                self.table.apply(event, now);
            }
            TrackerTask::Tick => {
                self.table.tick(now);
                self.publish(now);
            }
            TrackerTask::Checkpoint => {
                let state = self.table.checkpoint(now);
                match self.checkpoints.try_send(state) {
                    Ok(_) => debug!("Queued checkpoint"),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("Storage is behind, dropping checkpoint")
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        warn!("Storage has stopped, dropping checkpoint")
                    }
                }
            }
            TrackerTask::Snapshot(reply) => {
                let snapshot = self.table.snapshot(now);
                if reply.send(snapshot).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
        }
    }

    /// Best effort push of the current table. The table was just reconciled by the tick.
    fn publish(&mut self, now: DateTime<Utc>) {
        if self.updates.receiver_count() == 0 {
            trace!("{}", TrackerError::NoListener);
            return;
        }
        let snapshot = self.table.snapshot(now);
        if self.updates.send(Arc::new(snapshot)).is_err() {
            trace!("{}", TrackerError::NoListener);
        }
    }

    /// Executes the tracker event loop until shutdown, then hands a last checkpoint to storage.
    /// Tasks queued before shutdown are still applied.
    pub async fn run(mut self) -> Result<()> {
        info!("Tracking {} restored tabs", self.table.len());
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                task = self.receiver.recv() => match task {
                    Some(task) => self.process(task),
                    None => break,
                }
            }
        }

        self.receiver.close();
        let mut drained = 0;
        while let Ok(task) = self.receiver.try_recv() {
            self.process(task);
            drained += 1;
        }
        if drained > 0 {
            debug!("Applied {drained} tasks queued before shutdown");
        }

        let state = self.table.checkpoint(self.time_provider.time());
        self.checkpoints
            .send(state)
            .await
            .inspect_err(|_| warn!("Storage stopped before the final checkpoint"))
            .ok();
        info!("Tracker stopped");
        Ok(())
    }
}
