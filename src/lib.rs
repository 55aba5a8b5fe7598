//! Native messaging host and cli measuring how long you spend on every browser tab.
//! The browser extension forwards tab events, the host keeps the tally and answers snapshot
//! requests, and the cli reports what was saved.
//!

pub mod cli;
pub mod daemon;
pub mod host;
pub mod utils;
