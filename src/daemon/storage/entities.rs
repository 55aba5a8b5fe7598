use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::daemon::tracker::record::{TabId, TabRecord, WindowId};

/// The struct used for storing a tab on the disk. Running spans are never stored: whatever was
/// running has been folded into `accumulated` before the checkpoint was taken.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TabRecordEntity {
    pub tab_id: TabId,
    #[serde(default)]
    pub window_id: Option<WindowId>,
    pub url: Arc<str>,
    pub hostname: Arc<str>,
    #[serde(with = "duration_ser")]
    pub accumulated: Duration,
    pub is_open: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<&TabRecord> for TabRecordEntity {
    fn from(record: &TabRecord) -> Self {
        Self {
            tab_id: record.tab_id,
            window_id: record.window_id,
            url: record.url.clone(),
            hostname: record.hostname.clone(),
            accumulated: record.accumulated,
            is_open: record.is_open,
            closed_at: record.closed_at,
        }
    }
}

impl From<TabRecordEntity> for TabRecord {
    fn from(
        TabRecordEntity {
            tab_id,
            window_id,
            url,
            hostname,
            accumulated,
            is_open,
            closed_at,
        }: TabRecordEntity,
    ) -> Self {
        TabRecord {
            tab_id,
            window_id,
            url,
            hostname,
            accumulated: accumulated.max(Duration::zero()),
            active_since: None,
            is_open,
            closed_at,
        }
    }
}

/// Whole table keyed by tab id, as written to `state.json`.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StateEntity {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,
    pub tabs: BTreeMap<TabId, TabRecordEntity>,
}

mod duration_ser {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(ms))
    }
}
