use std::{future::Future, path::PathBuf};

use anyhow::Result;
use collection::ticker::TickerModule;
use config::TrackerConfig;
use processing::{local_save::LocalSaver, ProcessingModule};
use storage::{
    entities::StateEntity,
    state_storage::{StateStorage, StateStorageImpl},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracker::{TrackerHandle, TrackerModule};

use crate::{
    host::NativeHost,
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod collection;
pub mod config;
pub mod processing;
pub mod shutdown;
pub mod storage;
pub mod tracker;

const CHECKPOINT_QUEUE_SIZE: usize = 2;

/// Represents the starting point for the host: the browser talks to us over stdin/stdout.
pub async fn start_daemon(dir: PathBuf, config: TrackerConfig) -> Result<()> {
    run_host(
        dir,
        config,
        tokio::io::stdin(),
        tokio::io::stdout(),
        DefaultClock,
    )
    .await
}

/// Wires every module together and runs them until the browser goes away or the process is
/// interrupted.
pub async fn run_host(
    dir: PathBuf,
    config: TrackerConfig,
    input: impl AsyncRead + Unpin,
    output: impl AsyncWrite + Unpin,
    clock: impl Clock + Clone,
) -> Result<()> {
    let storage = StateStorageImpl::new(dir)?;
    let restored = storage
        .load()
        .await
        .inspect_err(|e| error!("Couldn't restore saved tabs {e:?}"))
        .ok()
        .flatten();

    let shutdown_token = CancellationToken::new();
    let (sender, receiver) = mpsc::channel::<StateEntity>(CHECKPOINT_QUEUE_SIZE);

    let (tracker, handle) =
        create_tracker(&config, restored, sender, &shutdown_token, clock.clone());
    let ticker = create_ticker(handle.clone(), &config, &shutdown_token, clock);
    let processor = create_processor(storage, receiver);
    let host = NativeHost::new(input, output, handle, shutdown_token.clone());

    let (_, host_result, tracker_result, ticker_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        host.run(),
        cancel_on_exit(tracker.run(), &shutdown_token),
        cancel_on_exit(ticker.run(), &shutdown_token),
        processor.run(),
    );

    if let Err(host_result) = host_result {
        error!("Host module got an error {:?}", host_result);
    }

    if let Err(tracker_result) = tracker_result {
        error!("Tracker module got an error {:?}", tracker_result);
    }

    if let Err(ticker_result) = ticker_result {
        error!("Ticker module got an error {:?}", ticker_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

/// A module stopping on its own takes the rest down with it.
async fn cancel_on_exit(
    module: impl Future<Output = Result<()>>,
    shutdown_token: &CancellationToken,
) -> Result<()> {
    let result = module.await;
    shutdown_token.cancel();
    result
}

fn create_tracker(
    config: &TrackerConfig,
    restored: Option<StateEntity>,
    checkpoints: mpsc::Sender<StateEntity>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> (TrackerModule, TrackerHandle) {
    let mut table = config.create_table();
    if let Some(restored) = restored {
        table.restore(restored);
    }
    TrackerModule::new(table, checkpoints, shutdown_token.clone(), Box::new(clock))
}

fn create_ticker(
    tracker: TrackerHandle,
    config: &TrackerConfig,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> TickerModule {
    TickerModule::new(
        tracker,
        shutdown_token.clone(),
        config.tick_interval,
        config.persist_interval,
        Box::new(clock),
    )
}

fn create_processor(
    storage: StateStorageImpl,
    receiver: mpsc::Receiver<StateEntity>,
) -> ProcessingModule<LocalSaver<StateStorageImpl>> {
    ProcessingModule::new(receiver, LocalSaver::new(storage))
}
