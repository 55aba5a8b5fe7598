use serde::Deserialize;
use tokio::sync::oneshot;

use super::{
    record::{TabId, WindowId},
    snapshot::Snapshot,
};

/// Tab as listed by `chrome.tabs.query`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub tab_id: TabId,
    #[serde(default)]
    pub window_id: Option<WindowId>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Browser side events the table reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    TabCreated {
        tab_id: TabId,
        window_id: Option<WindowId>,
        url: Option<String>,
    },
    TabUpdated {
        tab_id: TabId,
        url: Option<String>,
        is_complete: bool,
    },
    TabActivated {
        tab_id: TabId,
        window_id: Option<WindowId>,
    },
    TabRemoved {
        tab_id: TabId,
    },
    /// `None` means every browser window lost focus.
    WindowFocusChanged {
        window_id: Option<WindowId>,
        tab_id: Option<TabId>,
    },
    BrowserStartup {
        tabs: Vec<TabInfo>,
    },
    SyncTabs {
        tabs: Vec<TabInfo>,
    },
    UserActivity,
}

/// Unit of work for the tracker worker. Everything touching the table goes through here, one
/// task at a time.
#[derive(Debug)]
pub enum TrackerTask {
    Browser(BrowserEvent),
    Tick,
    Checkpoint,
    Snapshot(oneshot::Sender<Snapshot>),
}
