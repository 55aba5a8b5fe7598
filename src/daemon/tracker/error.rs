use thiserror::Error;

use super::record::TabId;

/// Everything the tracker can run into. None of these are fatal: the first three are recovered
/// where they happen and only show up in logs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("can't extract a hostname from {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },
    #[error("nobody is listening for snapshot updates")]
    NoListener,
    #[error("tab {0} wasn't tracked yet")]
    MissingRecord(TabId),
    #[error("tracker worker has stopped")]
    WorkerGone,
}
