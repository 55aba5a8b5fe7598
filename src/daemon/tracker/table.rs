use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace, warn};

use crate::daemon::storage::entities::{StateEntity, TabRecordEntity};

use super::{
    error::TrackerError,
    idle::IdleEvaluator,
    record::{TabId, TabRecord, WindowId},
    snapshot::{Snapshot, SnapshotEntry},
    task::{BrowserEvent, TabInfo},
};

/// Which browser window currently has focus, as far as events told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Unknown,
    Window(WindowId),
    Lost,
}

/// Table of every tab seen during the session. Records are only reachable through the operations
/// below, and at most one of them is active at a time.
#[derive(Debug)]
pub struct TabTable {
    records: BTreeMap<TabId, TabRecord>,
    active: Option<TabId>,
    focus: Focus,
    /// Last activated tab of every window, used to resolve focus changes.
    window_tabs: HashMap<WindowId, TabId>,
    idle: IdleEvaluator,
    last_activity: Option<DateTime<Utc>>,
    prune_closed_after: Option<Duration>,
}

impl Default for TabTable {
    fn default() -> Self {
        Self::new(IdleEvaluator::default(), None)
    }
}

impl TabTable {
    pub fn new(idle: IdleEvaluator, prune_closed_after: Option<Duration>) -> Self {
        Self {
            records: BTreeMap::new(),
            active: None,
            focus: Focus::Unknown,
            window_tabs: HashMap::new(),
            idle,
            last_activity: None,
            prune_closed_after,
        }
    }

    pub fn get(&self, tab_id: TabId) -> Option<&TabRecord> {
        self.records.get(&tab_id)
    }

    pub fn active(&self) -> Option<&TabRecord> {
        self.active.and_then(|id| self.records.get(&id))
    }

    pub fn records(&self) -> impl Iterator<Item = &TabRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Single entry point for browser events.
    pub fn apply(&mut self, event: BrowserEvent, now: DateTime<Utc>) {
        match event {
            BrowserEvent::TabCreated {
                tab_id,
                window_id,
                url,
            } => self.on_tab_created(tab_id, window_id, url.as_deref(), now),
            BrowserEvent::TabUpdated {
                tab_id,
                url,
                is_complete,
            } => self.on_tab_updated(tab_id, url.as_deref(), is_complete, now),
            BrowserEvent::TabActivated { tab_id, window_id } => {
                self.on_tab_activated(tab_id, window_id, now)
            }
            BrowserEvent::TabRemoved { tab_id } => self.on_tab_removed(tab_id, now),
            BrowserEvent::WindowFocusChanged { window_id, tab_id } => {
                self.on_window_focus_changed(window_id, tab_id, now)
            }
            BrowserEvent::BrowserStartup { tabs } => self.on_browser_startup(&tabs, now),
            BrowserEvent::SyncTabs { tabs } => self.sync_tabs(&tabs, now),
            BrowserEvent::UserActivity => self.on_user_activity(now),
        }
    }

    pub fn on_tab_created(
        &mut self,
        tab_id: TabId,
        window_id: Option<WindowId>,
        url: Option<&str>,
        now: DateTime<Utc>,
    ) {
        self.touch(now);
        let record = self
            .records
            .entry(tab_id)
            .or_insert_with(|| TabRecord::new(tab_id, window_id, url));
        if record.window_id.is_none() {
            record.window_id = window_id;
        }
    }

    /// Only completed navigations change the url. Navigating the active tab starts its span over.
    pub fn on_tab_updated(
        &mut self,
        tab_id: TabId,
        url: Option<&str>,
        is_complete: bool,
        now: DateTime<Utc>,
    ) {
        self.touch(now);
        let record = Self::entry(&mut self.records, tab_id);
        if let (true, Some(url)) = (is_complete, url) {
            record.set_url(url);
        }
        if self.active == Some(tab_id) {
            self.fold_active(now);
        }
    }

    pub fn on_tab_activated(
        &mut self,
        tab_id: TabId,
        window_id: Option<WindowId>,
        now: DateTime<Utc>,
    ) {
        self.touch(now);
        let record = Self::entry(&mut self.records, tab_id);
        if !record.is_open {
            warn!("Ignoring activation of closed tab {tab_id}");
            return;
        }
        let activate = match window_id {
            Some(window_id) => {
                record.window_id = Some(window_id);
                self.window_tabs.insert(window_id, tab_id);
                match self.focus {
                    Focus::Window(focused) => focused == window_id,
                    Focus::Unknown => {
                        self.focus = Focus::Window(window_id);
                        true
                    }
                    Focus::Lost => false,
                }
            }
            // Activations without a window are assumed to happen in front of the user.
            None => {
                if self.focus == Focus::Lost {
                    self.focus = Focus::Unknown;
                }
                true
            }
        };
        if activate {
            self.activate(tab_id, now);
        } else {
            trace!("Tab {tab_id} activated in a window without focus");
        }
    }

    /// Closed records stay in the table with their last total.
    pub fn on_tab_removed(&mut self, tab_id: TabId, now: DateTime<Utc>) {
        self.touch(now);
        if self.active == Some(tab_id) {
            self.deactivate(now);
        }
        let record = Self::entry(&mut self.records, tab_id);
        if record.is_open {
            record.is_open = false;
            record.closed_at = Some(now);
        }
        self.window_tabs.retain(|_, v| *v != tab_id);
    }

    /// `window_id = None` means the browser lost focus entirely. Otherwise the focused window's
    /// tab becomes active: the explicit `tab_id` if the browser sent one, else the last tab
    /// activated in that window.
    pub fn on_window_focus_changed(
        &mut self,
        window_id: Option<WindowId>,
        tab_id: Option<TabId>,
        now: DateTime<Utc>,
    ) {
        self.touch(now);
        let Some(window_id) = window_id else {
            self.deactivate(now);
            self.focus = Focus::Lost;
            return;
        };
        self.focus = Focus::Window(window_id);

        if let Some(tab_id) = tab_id {
            let record = Self::entry(&mut self.records, tab_id);
            if record.is_open {
                record.window_id = Some(window_id);
                self.window_tabs.insert(window_id, tab_id);
            }
        }

        let resolved = self
            .window_tabs
            .get(&window_id)
            .copied()
            .filter(|id| self.records.get(id).is_some_and(|v| v.is_open));
        match resolved {
            Some(tab_id) => self.activate(tab_id, now),
            None => {
                debug!("Couldn't resolve active tab of window {window_id}");
                self.deactivate(now);
            }
        }
    }

    pub fn on_user_activity(&mut self, now: DateTime<Utc>) {
        self.touch(now);
    }

    /// Throws away everything and starts over from the tabs the browser has right now.
    pub fn on_browser_startup(&mut self, tabs: &[TabInfo], now: DateTime<Utc>) {
        debug!("Browser startup, rebuilding table from {} tabs", tabs.len());
        self.records.clear();
        self.window_tabs.clear();
        self.active = None;
        self.focus = Focus::Unknown;
        self.last_activity = Some(now);
        self.insert_missing(tabs);
    }

    /// Adds tabs we somehow missed. Known records are left alone.
    pub fn sync_tabs(&mut self, tabs: &[TabInfo], now: DateTime<Utc>) {
        self.touch(now);
        self.insert_missing(tabs);
    }

    /// Periodic reconciliation: folds the active span and drops closed records past retention.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.fold_active(now);
        self.prune(now);
    }

    /// Reconciles, then renders every record.
    pub fn snapshot(&mut self, now: DateTime<Utc>) -> Snapshot {
        self.fold_active(now);
        Snapshot {
            records: self.records.values().map(SnapshotEntry::from).collect(),
        }
    }

    /// Reconciles, then copies the table into its persisted form.
    pub fn checkpoint(&mut self, now: DateTime<Utc>) -> StateEntity {
        self.fold_active(now);
        StateEntity {
            saved_at: now,
            tabs: self
                .records
                .iter()
                .map(|(id, record)| (*id, TabRecordEntity::from(record)))
                .collect(),
        }
    }

    /// Loads a persisted table. Restored records never come back active.
    pub fn restore(&mut self, state: StateEntity) {
        debug!("Restoring {} tabs saved at {}", state.tabs.len(), state.saved_at);
        for (tab_id, entity) in state.tabs {
            let mut record = TabRecord::from(entity);
            record.tab_id = tab_id;
            self.records.insert(tab_id, record);
        }
    }

    fn insert_missing(&mut self, tabs: &[TabInfo]) {
        for tab in tabs {
            self.records
                .entry(tab.tab_id)
                .or_insert_with(|| TabRecord::new(tab.tab_id, tab.window_id, tab.url.as_deref()));
        }
    }

    fn entry(records: &mut BTreeMap<TabId, TabRecord>, tab_id: TabId) -> &mut TabRecord {
        records.entry(tab_id).or_insert_with(|| {
            debug!("{}, creating it", TrackerError::MissingRecord(tab_id));
            TabRecord::new(tab_id, None, None)
        })
    }

    fn activate(&mut self, tab_id: TabId, now: DateTime<Utc>) {
        if self.active == Some(tab_id) {
            return;
        }
        self.deactivate(now);
        if let Some(record) = self.records.get_mut(&tab_id).filter(|v| v.is_open) {
            record.active_since = Some(now);
            self.active = Some(tab_id);
            trace!("Tab {tab_id} ({}) is now active", record.hostname);
        }
    }

    fn deactivate(&mut self, now: DateTime<Utc>) {
        self.fold_active(now);
        if let Some(record) = self.active.take().and_then(|id| self.records.get_mut(&id)) {
            record.active_since = None;
        }
    }

    /// Folds the active span into its record and restarts it at `now`. Past the idle deadline
    /// the span only counts up to the deadline.
    fn fold_active(&mut self, now: DateTime<Utc>) {
        let until = match self.idle.deadline(self.last_activity) {
            Some(deadline) if deadline < now => deadline,
            _ => now,
        };
        if let Some(record) = self.active.and_then(|id| self.records.get_mut(&id)) {
            let elapsed = record.fold(until, now);
            trace!("Folded {}ms into tab {}", elapsed.num_milliseconds(), record.tab_id);
        }
    }

    /// Marks user activity. Coming back from idle restarts the span so the idle gap isn't
    /// counted.
    fn touch(&mut self, now: DateTime<Utc>) {
        if self.idle.is_idle(self.last_activity, now) {
            self.fold_active(now);
        }
        self.last_activity = Some(now);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let Some(retention) = self.prune_closed_after else {
            return;
        };
        let before = self.records.len();
        self.records.retain(|_, record| {
            record.is_open || record.closed_at.map_or(true, |closed| now - closed < retention)
        });
        let pruned = before - self.records.len();
        if pruned > 0 {
            debug!("Pruned {pruned} closed tabs");
        }
    }
}
