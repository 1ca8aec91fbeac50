//! Local tree scanner
//!
//! Walks the local root (or a subtree of it) and reports every directory
//! and regular file as a [`RelativePath`]. Symbolic links are neither
//! followed nor reported. Entries whose names are not valid UTF-8 are
//! skipped with a warning, since they cannot be named on the remote side.

use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::pin::Pin;

use tracing::{debug, warn};

use ftpmirror_core::domain::{LocalDirectorySet, RelativePath};

use crate::SyncError;

/// Directories and files found under one subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTree {
    /// Directories below the scanned base, sorted (parents first)
    pub directories: Vec<RelativePath>,
    /// Regular files at any depth below the scanned base, sorted
    pub files: Vec<RelativePath>,
}

/// Collects the relative path of every directory under `root`, at any depth
///
/// # Errors
/// Returns an error if `root` itself cannot be read. Subdirectories that
/// vanish during the walk are skipped.
pub async fn scan_local_directories(root: &Path) -> Result<LocalDirectorySet, SyncError> {
    let mut tree = LocalTree::default();
    walk(root, root, &mut tree).await?;
    debug!(
        root = %root.display(),
        directories = tree.directories.len(),
        "Local directories scanned"
    );
    Ok(tree.directories.into_iter().collect())
}

/// Walks the subtree rooted at `base` (relative to `root`)
///
/// `base` itself is not included in the result.
///
/// # Errors
/// Returns an error if `base` cannot be read, including when it no longer
/// exists.
pub async fn scan_tree(root: &Path, base: &RelativePath) -> Result<LocalTree, SyncError> {
    let mut tree = LocalTree::default();
    walk(root, &base.to_local(root), &mut tree).await?;
    tree.directories.sort();
    tree.files.sort();
    Ok(tree)
}

/// Recursively walks `dir`, appending what it finds to `tree`
fn walk<'a>(
    root: &'a Path,
    dir: &'a Path,
    tree: &'a mut LocalTree,
) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };

            if file_type.is_symlink() {
                debug!(path = %entry_path.display(), "Skipping symbolic link");
                continue;
            }

            let relative = match RelativePath::from_local(&entry_path, root) {
                Ok(p) => p,
                Err(err) => {
                    warn!(path = ?entry_path, %err, "Skipping invalid path");
                    continue;
                }
            };

            if file_type.is_dir() {
                tree.directories.push(relative);
                match walk(root, &entry_path, tree).await {
                    Ok(()) => {}
                    Err(SyncError::IoError(err)) if err.kind() == ErrorKind::NotFound => {
                        debug!(path = %entry_path.display(), "Directory vanished during scan");
                    }
                    Err(err) => return Err(err),
                }
            } else if file_type.is_file() {
                tree.files.push(relative);
            }
        }

        Ok(())
    })
}
