use serde::{Deserialize, Serialize};

use crate::daemon::tracker::{
    record::{TabId, WindowId, WINDOW_ID_NONE},
    snapshot::{Snapshot, SnapshotEntry},
    task::{BrowserEvent, TabInfo},
};

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IncomingMessage {
    TabCreated {
        tab_id: TabId,
        url: Option<String>,
        window_id: Option<WindowId>,
    },
    TabUpdated {
        tab_id: TabId,
        url: Option<String>,
        /// `changeInfo.status`, only `"complete"` navigations change the url.
        status: Option<String>,
    },
    TabActivated {
        tab_id: TabId,
        window_id: Option<WindowId>,
    },
    TabRemoved {
        tab_id: TabId,
    },
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
    GetSnapshot,
}

/// What the host has to do with an incoming message.
#[derive(Debug, PartialEq, Eq)]
pub enum Request {
    Event(BrowserEvent),
    Snapshot,
}

impl From<IncomingMessage> for Request {
    fn from(value: IncomingMessage) -> Self {
        let event = match value {
            IncomingMessage::TabCreated {
                tab_id,
                url,
                window_id,
            } => BrowserEvent::TabCreated {
                tab_id,
                window_id,
                url,
            },
            IncomingMessage::TabUpdated {
                tab_id,
                url,
                status,
            } => BrowserEvent::TabUpdated {
                tab_id,
                url,
                is_complete: status.as_deref() == Some("complete"),
            },
            IncomingMessage::TabActivated { tab_id, window_id } => {
                BrowserEvent::TabActivated { tab_id, window_id }
            }
            IncomingMessage::TabRemoved { tab_id } => BrowserEvent::TabRemoved { tab_id },
            IncomingMessage::WindowFocusChanged { window_id, tab_id } => {
                BrowserEvent::WindowFocusChanged {
                    window_id: window_id.filter(|v| *v != WINDOW_ID_NONE),
                    tab_id,
                }
            }
            IncomingMessage::BrowserStartup { tabs } => BrowserEvent::BrowserStartup { tabs },
            IncomingMessage::SyncTabs { tabs } => BrowserEvent::SyncTabs { tabs },
            IncomingMessage::UserActivity => BrowserEvent::UserActivity,
            IncomingMessage::GetSnapshot => return Request::Snapshot,
        };
        Request::Event(event)
    }
}

/// Pushed without being asked. Nobody acknowledges these.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Notification {
    SnapshotUpdated { records: Vec<SnapshotEntry> },
    Error { message: String },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// Answer to `getSnapshot`: `{"records": [...]}`.
    Reply(Snapshot),
    Notification(Notification),
}

impl OutgoingMessage {
    pub fn snapshot_updated(snapshot: &Snapshot) -> Self {
        Self::Notification(Notification::SnapshotUpdated {
            records: snapshot.records.clone(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Notification(Notification::Error {
            message: message.into(),
        })
    }
}
