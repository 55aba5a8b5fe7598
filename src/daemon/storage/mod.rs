//!  Storage is organized through [state_storage::StateStorageImpl].
//!  The basic idea is:
//!   - There is one state file per application directory.
//!   - The file holds the whole tab table keyed by tab id, replaced atomically on every save.
//!   - Running spans are folded before saving, so the file never holds an active tab.

pub mod entities;
pub mod state_storage;
