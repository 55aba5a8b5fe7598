use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use super::storage::entities::StateEntity;

pub mod local_save;
pub mod module;

/// Receives checkpoints from the tracker and persists them. Runs beside the tracker so slow disks
/// never hold up event processing.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<StateEntity>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<StateEntity>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(state) = self.receiver.recv().await {
            debug!("Processing checkpoint of {} tabs", state.tabs.len());
            let saved_at = state.saved_at;
            match self.processor.process_next(state).await {
                Ok(_) => {
                    info!("Processed checkpoint taken at {saved_at}")
                }
                Err(e) => {
                    error!("Error processing checkpoint taken at {saved_at}: {e:?}")
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
