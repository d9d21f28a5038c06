//! Pulling new entries from the network into the tree.
//!
//! [`SyncEngine`] brings a single feed up to date against its watermark;
//! [`TreeSynchronizer`] fans out over a folder tree and bounds how many feed
//! syncs run at once.

pub mod engine;
pub mod import;
pub mod tree;

pub use engine::{entries_since, SyncEngine};
pub use import::ImportReport;
pub use tree::{TreeSynchronizer, UpdateSummary, DEFAULT_WORKERS};
