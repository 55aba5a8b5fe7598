use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::utils::time::as_seconds;

use super::record::{TabId, TabRecord};

/// Display-ready view of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub tab_id: TabId,
    pub hostname: Arc<str>,
    pub url: Arc<str>,
    pub active_seconds: f64,
    pub is_open: bool,
    pub is_active: bool,
}

impl From<&TabRecord> for SnapshotEntry {
    fn from(record: &TabRecord) -> Self {
        Self {
            tab_id: record.tab_id,
            hostname: record.hostname.clone(),
            url: record.url.clone(),
            active_seconds: as_seconds(record.accumulated),
            is_open: record.is_open,
            is_active: record.is_active(),
        }
    }
}

/// Every known record, open and closed, ordered by tab id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn get(&self, tab_id: TabId) -> Option<&SnapshotEntry> {
        self.records.iter().find(|v| v.tab_id == tab_id)
    }
}
