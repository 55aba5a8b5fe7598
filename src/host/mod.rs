//! Chrome native messaging endpoint.
//!
//! [NativeHost] reads frames from the browser, turns them into tracker tasks and writes replies
//! plus pushed snapshot updates back. Reading and writing run side by side so a slow browser never
//! stops events from reaching the tracker.

pub mod framing;
pub mod messages;

use std::io::ErrorKind;

use anyhow::Result;
use framing::{read_frame, write_message};
use messages::{IncomingMessage, OutgoingMessage, Request};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast, mpsc},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::daemon::tracker::{snapshot::Snapshot, TrackerHandle};

const OUTGOING_QUEUE_SIZE: usize = 16;

pub struct NativeHost<R, W> {
    input: R,
    output: W,
    tracker: TrackerHandle,
    shutdown: CancellationToken,
}

impl<R, W> NativeHost<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W, tracker: TrackerHandle, shutdown: CancellationToken) -> Self {
        Self {
            input,
            output,
            tracker,
            shutdown,
        }
    }

    /// Runs until the browser closes the pipe or shutdown is requested. Either way everyone else
    /// is told to stop.
    pub async fn run(self) -> Result<()> {
        let Self {
            input,
            output,
            tracker,
            shutdown,
        } = self;
        let (outgoing, replies) = mpsc::channel(OUTGOING_QUEUE_SIZE);
        let updates = tracker.subscribe();

        let (read_result, write_result) = tokio::join!(
            read_loop(input, tracker, outgoing, &shutdown),
            async {
                let result = write_loop(output, replies, updates).await;
                if result.is_err() {
                    shutdown.cancel();
                }
                result
            },
        );
        shutdown.cancel();

        read_result.inspect_err(|e| error!("Failed reading from the browser {e:?}"))?;
        write_result.inspect_err(|e| error!("Failed writing to the browser {e:?}"))
    }
}

async fn read_loop(
    mut input: impl AsyncRead + Unpin,
    tracker: TrackerHandle,
    outgoing: mpsc::Sender<OutgoingMessage>,
    shutdown: &CancellationToken,
) -> Result<()> {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            frame = read_frame(&mut input) => frame,
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("Skipping incoming message {e}");
                outgoing
                    .send(OutgoingMessage::error("message too large"))
                    .await?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let Some(frame) = frame else {
            info!("Browser closed the connection");
            shutdown.cancel();
            return Ok(());
        };

        let message = match serde_json::from_slice::<IncomingMessage>(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "Ignoring malformed message {}: {e}",
                    String::from_utf8_lossy(&frame)
                );
                outgoing
                    .send(OutgoingMessage::error(format!("malformed message: {e}")))
                    .await?;
                continue;
            }
        };

        debug!("Received {:?}", message);
        match Request::from(message) {
            Request::Event(event) => tracker.dispatch(event).await?,
            Request::Snapshot => {
                let snapshot = tracker.snapshot().await?;
                outgoing.send(OutgoingMessage::Reply(snapshot)).await?;
            }
        }
    }
}

/// Writes replies first, then whatever the tracker pushed. Ends once the reader is gone and every
/// reply has been written.
async fn write_loop(
    mut output: impl AsyncWrite + Unpin,
    mut replies: mpsc::Receiver<OutgoingMessage>,
    mut updates: broadcast::Receiver<std::sync::Arc<Snapshot>>,
) -> Result<()> {
    let mut updates_closed = false;
    loop {
        let message = tokio::select! {
            biased;
            reply = replies.recv() => match reply {
                Some(reply) => reply,
                None => return Ok(()),
            },
            update = updates.recv(), if !updates_closed => match update {
                Ok(snapshot) => OutgoingMessage::snapshot_updated(&snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Skipped {skipped} snapshot updates");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    updates_closed = true;
                    continue;
                }
            },
        };

        match write_message(&mut output, &message).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("Dropping outgoing message {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
