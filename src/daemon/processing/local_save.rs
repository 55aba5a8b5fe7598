use std::collections::BTreeMap;

use anyhow::Result;
use tracing::debug;

use crate::daemon::{
    storage::{
        entities::{StateEntity, TabRecordEntity},
        state_storage::StateStorage,
    },
    tracker::record::TabId,
};

use super::module::EventProcessor;

/// Represents saving module. Saving module main goal is to bridge
/// [ProcessingModule](super::ProcessingModule) and [StateStorage]. Checkpoints identical to the
/// last saved one are skipped.
pub struct LocalSaver<S: StateStorage> {
    state_storage: S,
    last_saved: Option<BTreeMap<TabId, TabRecordEntity>>,
}

impl<S: StateStorage> LocalSaver<S> {
    pub fn new(state_storage: S) -> Self {
        Self {
            state_storage,
            last_saved: None,
        }
    }
}

impl<S: StateStorage> EventProcessor for LocalSaver<S> {
    async fn process_next(&mut self, message: StateEntity) -> anyhow::Result<()> {
        if self.last_saved.as_ref() == Some(&message.tabs) {
            debug!("Checkpoint unchanged, skipping");
            return Ok(());
        }

        self.state_storage.save(&message).await?;
        self.last_saved = Some(message.tabs);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        debug!("Saver finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::{anyhow, Result};
    use tokio::sync::mpsc;

    use crate::{
        daemon::{
            processing::{module::EventProcessor, ProcessingModule},
            storage::{
                entities::{StateEntity, TabRecordEntity},
                state_storage::MockStateStorage,
            },
            tracker::record::TabRecord,
        },
        utils::{clock::manual::at_ms, logging::TEST_LOGGING},
    };

    use super::LocalSaver;

    fn state(saved_at: i64, tab_ids: &[i64]) -> StateEntity {
        StateEntity {
            saved_at: at_ms(saved_at),
            tabs: tab_ids
                .iter()
                .map(|id| {
                    (
                        *id,
                        TabRecordEntity::from(&TabRecord::new(*id, None, Some("https://a.example"))),
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn test_saver_skips_unchanged() -> Result<()> {
        let mut storage = MockStateStorage::new();
        storage
            .expect_save()
            .withf(|state| !state.tabs.is_empty())
            .times(2)
            .returning(|_| Ok(()));

        let mut saver = LocalSaver::new(storage);
        saver.process_next(state(0, &[1])).await?;
        saver.process_next(state(1000, &[1])).await?;
        saver.process_next(state(2000, &[1, 2])).await?;
        saver.finalize().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_saver_retries_after_failure() -> Result<()> {
        let mut storage = MockStateStorage::new();
        let mut failed = false;
        storage.expect_save().times(2).returning(move |_| {
            if failed {
                Ok(())
            } else {
                failed = true;
                Err(anyhow!("disk full"))
            }
        });

        let mut saver = LocalSaver::new(storage);
        assert!(saver.process_next(state(0, &[1])).await.is_err());
        saver.process_next(state(1000, &[1])).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_processing_module_drains_channel() -> Result<()> {
        *TEST_LOGGING;
        let mut storage = MockStateStorage::new();
        storage.expect_save().times(3).returning(|_| Ok(()));

        let (sender, receiver) = mpsc::channel(4);
        let processor = ProcessingModule::new(receiver, LocalSaver::new(storage));

        sender.send(state(0, &[1])).await?;
        sender.send(state(1000, &[1, 2])).await?;
        sender.send(state(2000, &[2])).await?;
        drop(sender);

        processor.run().await
    }
}
