//! Remote change detection
//!
//! Only "changed or not" is reported; the planner re-derives what is
//! missing from scratch on every pass.

use ftpmirror_core::domain::DirectorySnapshot;

/// Returns true if the two snapshots hold different directory names
pub fn has_changed(prev: &DirectorySnapshot, curr: &DirectorySnapshot) -> bool {
    prev != curr
}

/// Like [`has_changed`], treating "no previous snapshot" as a change
///
/// The first successful listing after start-up therefore always triggers
/// a reconciliation pass.
pub fn snapshot_changed(prev: Option<&DirectorySnapshot>, curr: &DirectorySnapshot) -> bool {
    prev.map_or(true, |prev| has_changed(prev, curr))
}
