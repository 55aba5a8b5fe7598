use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use url::Url;

use super::error::TrackerError;

/// Tab id as handed out by the browser.
pub type TabId = i64;
pub type WindowId = i64;

/// Chrome reports `windows.WINDOW_ID_NONE` when every browser window lost focus.
pub const WINDOW_ID_NONE: WindowId = -1;

/// Hostname of every tab whose url can't be parsed or has no host part.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// Accounting state of a single tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabRecord {
    pub tab_id: TabId,
    pub window_id: Option<WindowId>,
    pub url: Arc<str>,
    pub hostname: Arc<str>,
    pub accumulated: Duration,
    /// Start of the running span. Only the active record has one.
    pub active_since: Option<DateTime<Utc>>,
    pub is_open: bool,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TabRecord {
    pub fn new(tab_id: TabId, window_id: Option<WindowId>, url: Option<&str>) -> Self {
        let url = url.unwrap_or_default();
        Self {
            tab_id,
            window_id,
            url: url.into(),
            hostname: hostname_or_unknown(url),
            accumulated: Duration::zero(),
            active_since: None,
            is_open: true,
            closed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.into();
        self.hostname = hostname_or_unknown(url);
    }

    /// Adds the running span up to `until` and restarts it at `restart`. Returns what was added.
    /// A span ending before it started adds nothing, so `accumulated` never shrinks.
    pub(super) fn fold(&mut self, until: DateTime<Utc>, restart: DateTime<Utc>) -> Duration {
        let Some(since) = self.active_since else {
            return Duration::zero();
        };
        let elapsed = (until - since).max(Duration::zero());
        self.accumulated += elapsed;
        self.active_since = Some(restart);
        elapsed
    }
}

pub fn parse_hostname(url: &str) -> Result<Arc<str>, TrackerError> {
    let parsed = Url::parse(url).map_err(|e| TrackerError::MalformedUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(host.into()),
        _ => Err(TrackerError::MalformedUrl {
            url: url.to_string(),
            reason: "no host".into(),
        }),
    }
}

pub fn hostname_or_unknown(url: &str) -> Arc<str> {
    parse_hostname(url).unwrap_or_else(|e| {
        tracing::trace!("{e}");
        UNKNOWN_HOSTNAME.into()
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::{daemon::tracker::error::TrackerError, utils::clock::manual::at_ms};

    use super::{hostname_or_unknown, parse_hostname, TabRecord, UNKNOWN_HOSTNAME};

    #[test]
    fn test_hostname_extraction() {
        assert_eq!(&*hostname_or_unknown("https://www.reddit.com/r/rust"), "www.reddit.com");
        assert_eq!(&*hostname_or_unknown("http://github.com"), "github.com");
        assert_eq!(&*hostname_or_unknown("chrome://newtab/"), "newtab");
    }

    #[test]
    fn test_malformed_url_is_unknown() {
        assert_eq!(&*hostname_or_unknown("not a url"), UNKNOWN_HOSTNAME);
        assert_eq!(&*hostname_or_unknown(""), UNKNOWN_HOSTNAME);
        assert_eq!(&*hostname_or_unknown("about:blank"), UNKNOWN_HOSTNAME);
        assert!(matches!(
            parse_hostname("not a url"),
            Err(TrackerError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_fold_never_goes_backwards() {
        let mut record = TabRecord::new(1, None, Some("https://docs.rs"));
        record.active_since = Some(at_ms(5000));

        assert_eq!(record.fold(at_ms(4000), at_ms(4000)), Duration::zero());
        assert_eq!(record.accumulated, Duration::zero());

        assert_eq!(record.fold(at_ms(6500), at_ms(6500)), Duration::milliseconds(2500));
        assert_eq!(record.accumulated, Duration::milliseconds(2500));
        assert_eq!(record.active_since, Some(at_ms(6500)));
    }
}
