use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::entities::StateEntity;

const STATE_FILE: &str = "state.json";

/// Interface for abstracting storage of the tab table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Last saved table. Nothing saved yet, or nothing readable, is `None`.
    async fn load(&self) -> Result<Option<StateEntity>>;

    /// Replaces the saved table.
    async fn save(&self, state: &StateEntity) -> Result<()>;
}

/// The main realization of [StateStorage]: a single json file replaced on every save.
pub struct StateStorageImpl {
    state_path: PathBuf,
}

impl StateStorageImpl {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            state_path: dir.join(STATE_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.state_path
    }

    async fn write_with_file(file: &mut File, state: &StateEntity) -> Result<()> {
        // Truncating only after the lock is held, so a concurrent writer never sees a cut file.
        file.set_len(0).await?;
        let buffer = serde_json::to_vec_pretty(state)?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl StateStorage for StateStorageImpl {
    async fn load(&self) -> Result<Option<StateEntity>> {
        async fn extract(path: &Path) -> std::result::Result<String, std::io::Error> {
            debug!("Extracting {path:?}");
            let mut file = File::open(path).await?;
            file.lock_shared()?;
            let mut content = String::new();
            let read = file.read_to_string(&mut content).await;
            file.unlock_async().await?;
            read?;
            Ok(content)
        }

        let content = match extract(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };

        match serde_json::from_str::<StateEntity>(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                // Starting over beats refusing to start.
                warn!("State file {:?} is corrupted: {e}", self.state_path);
                Ok(None)
            }
        }
    }

    async fn save(&self, state: &StateEntity) -> Result<()> {
        let temporary = self.state_path.with_extension("json.tmp");
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&temporary)
            .await?;

        file.lock_exclusive()?;
        let result = Self::write_with_file(&mut file, state).await;
        file.unlock_async().await?;
        result?;
        drop(file);

        tokio::fs::rename(&temporary, &self.state_path).await?;
        debug!("Saved {} tabs into {:?}", state.tabs.len(), self.state_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::Result;
    use chrono::Duration;
    use tempfile::tempdir;

    use crate::{
        daemon::{
            storage::entities::{StateEntity, TabRecordEntity},
            tracker::record::TabRecord,
        },
        utils::clock::manual::at_ms,
    };

    use super::{StateStorage, StateStorageImpl};

    fn test_state() -> StateEntity {
        let mut record = TabRecord::new(12, Some(3), Some("https://crates.io/crates/tokio"));
        record.accumulated = Duration::milliseconds(42_500);
        let mut closed = TabRecord::new(13, None, Some("not a url"));
        closed.is_open = false;
        closed.closed_at = Some(at_ms(900));

        StateEntity {
            saved_at: at_ms(1000),
            tabs: BTreeMap::from([
                (12, TabRecordEntity::from(&record)),
                (13, TabRecordEntity::from(&closed)),
            ]),
        }
    }

    #[tokio::test]
    async fn test_state_storage_basic() -> Result<()> {
        let dir = tempdir()?;
        let storage = StateStorageImpl::new(dir.path().to_owned())?;

        storage.save(&test_state()).await?;
        let loaded = storage.load().await?;

        assert_eq!(loaded, Some(test_state()));
        assert!(!dir.path().join("state.json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_state_storage_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let storage = StateStorageImpl::new(dir.path().to_owned())?;

        let mut state = test_state();
        storage.save(&state).await?;
        state.tabs.remove(&13);
        storage.save(&state).await?;

        let loaded = storage.load().await?.unwrap();
        assert_eq!(loaded.tabs.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_state_storage_missing_file() -> Result<()> {
        let dir = tempdir()?;
        let storage = StateStorageImpl::new(dir.path().join("nested"))?;
        assert_eq!(storage.load().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_state_storage_corrupted_file() -> Result<()> {
        let dir = tempdir()?;
        let storage = StateStorageImpl::new(dir.path().to_owned())?;
        std::fs::write(storage.path(), "{\"savedAt\": 10, \"tabs\": {\"1\": ")?;
        assert_eq!(storage.load().await?, None);
        Ok(())
    }
}
