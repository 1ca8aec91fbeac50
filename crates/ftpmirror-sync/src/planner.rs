//! Upload planner
//!
//! Decides which local directories must be uploaded: exactly those whose
//! relative path is not a known remote directory name. Files inside a
//! directory that already exists remotely are never compared.

use std::collections::BTreeSet;

use ftpmirror_core::domain::{DirectorySnapshot, LocalDirectorySet, RelativePath};

/// Returns `local − remote`, sorted with parents before children
pub fn plan_uploads(local: &LocalDirectorySet, remote: &DirectorySnapshot) -> Vec<RelativePath> {
    local
        .iter()
        .filter(|path| !remote.contains(path.as_str()))
        .cloned()
        .collect()
}

/// Drops every entry that has an ancestor in the same list
///
/// Uploading a directory walks its whole subtree, so `A/B` is redundant
/// when `A` is also pending.
pub fn collapse_nested(pending: Vec<RelativePath>) -> Vec<RelativePath> {
    let all: BTreeSet<RelativePath> = pending.iter().cloned().collect();

    pending
        .into_iter()
        .filter(|path| {
            let mut ancestor = path.parent();
            while let Some(current) = ancestor {
                if all.contains(&current) {
                    return false;
                }
                ancestor = current.parent();
            }
            true
        })
        .collect()
}
