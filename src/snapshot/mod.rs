//! Snapshot history
//!
//! Diffs between consecutive snapshots of a division and the archive views
//! built on top of them.

pub mod archive;
pub mod diff;

pub use archive::{group_by_period, recent_changes};
pub use diff::diff;
