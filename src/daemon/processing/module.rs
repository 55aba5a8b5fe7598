use anyhow::Result;

use crate::daemon::storage::entities::StateEntity;

/// Represents a checkpoint processor. Local state file is the only one today, but nothing here
/// assumes the checkpoint ends up on this machine.
pub trait EventProcessor {
    fn process_next(&mut self, message: StateEntity) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
