use std::time::Duration;

use crate::daemon::tracker::{idle::IdleEvaluator, table::TabTable};

/// How often the active span is reconciled and pushed to the browser.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// How often the table is written to disk.
pub const DEFAULT_PERSIST_INTERVAL: Duration = Duration::from_secs(60);

/// Knobs of the host. Both optional policies are off by default: spans accrue for as long as a
/// tab stays active, and closed tabs stay until the browser restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub tick_interval: Duration,
    pub persist_interval: Duration,
    pub idle_timeout: Option<chrono::Duration>,
    pub prune_closed_after: Option<chrono::Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            persist_interval: DEFAULT_PERSIST_INTERVAL,
            idle_timeout: None,
            prune_closed_after: None,
        }
    }
}

impl TrackerConfig {
    pub fn create_table(&self) -> TabTable {
        TabTable::new(IdleEvaluator::new(self.idle_timeout), self.prune_closed_after)
    }
}
