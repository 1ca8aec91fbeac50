//! Shared fixtures for the engine integration tests

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use ftpmirror_sync::testing::{MemoryRemote, RemoteCall};
use ftpmirror_sync::ReconciliationEngine;

pub const POLL: Duration = Duration::from_secs(5);
pub const RECONNECT: Duration = Duration::from_secs(5);

/// A temporary local root populated from `(path, contents)` pairs
///
/// Paths ending in `/` are created as directories.
pub fn local_tree(entries: &[(&str, &[u8])]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (path, contents) in entries {
        write_entry(dir.path(), path, contents);
    }
    dir
}

pub fn write_entry(root: &Path, path: &str, contents: &[u8]) {
    let full = root.join(path.trim_end_matches('/'));
    if path.ends_with('/') {
        fs::create_dir_all(&full).expect("create dir");
    } else {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&full, contents).expect("write file");
    }
}

pub fn engine(remote: &MemoryRemote, root: &Path) -> ReconciliationEngine {
    ReconciliationEngine::new(remote.connector(), root, POLL, RECONNECT)
}

pub fn mkdir_count(remote: &MemoryRemote) -> usize {
    remote.count_calls(|c| matches!(c, RemoteCall::MakeDirectory(_)))
}

pub fn store_count(remote: &MemoryRemote) -> usize {
    remote.count_calls(|c| matches!(c, RemoteCall::StoreFile(_)))
}
