//! Recursive uploader
//!
//! Mirrors one local directory onto the remote side: the directory itself,
//! every nested subdirectory (parents first) and every file beneath it.
//!
//! ## Failure policy
//!
//! - A rejected create or store (e.g. "already exists") is recorded and the
//!   walk continues with the next item.
//! - A local file that vanished before it could be opened is skipped.
//! - Any other transport error means the session is gone. It is recorded
//!   against the item that hit it and returned, so the caller can stop the
//!   pass and reconnect instead of replaying every remaining item against a
//!   dead connection.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};

use ftpmirror_core::domain::RelativePath;
use ftpmirror_core::ports::{IRemoteSession, TransportError};

use crate::scanner;
use crate::SyncError;

// ============================================================================
// Report types
// ============================================================================

/// Which step of an upload failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    /// Creating a remote directory
    MakeDirectory,
    /// Reading the local side (directory walk or file open)
    ReadLocal,
    /// Storing a file remotely
    StoreFile,
}

impl std::fmt::Display for UploadStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UploadStep::MakeDirectory => "make directory",
            UploadStep::ReadLocal => "read local",
            UploadStep::StoreFile => "store file",
        })
    }
}

/// One item that could not be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub path: RelativePath,
    pub step: UploadStep,
    pub cause: String,
}

/// Outcome of uploading one or more directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Remote directories created
    pub directories_created: Vec<RelativePath>,
    /// Remote directories whose create was rejected (typically "already exists")
    pub directories_existing: Vec<RelativePath>,
    /// Files stored remotely
    pub files_uploaded: Vec<RelativePath>,
    /// Files that vanished locally before they could be read
    pub files_skipped: Vec<RelativePath>,
    /// Total bytes sent
    pub bytes_uploaded: u64,
    /// Items that failed
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    /// Returns true if nothing was attempted
    pub fn is_empty(&self) -> bool {
        self.directories_created.is_empty()
            && self.directories_existing.is_empty()
            && self.files_uploaded.is_empty()
            && self.files_skipped.is_empty()
            && self.failures.is_empty()
    }

    fn fail(&mut self, path: &RelativePath, step: UploadStep, cause: impl ToString) {
        self.failures.push(UploadFailure {
            path: path.clone(),
            step,
            cause: cause.to_string(),
        });
    }
}

// ============================================================================
// Uploads
// ============================================================================

/// Uploads the local directory `dir` and everything beneath it
///
/// # Errors
/// Returns the transport error that ended the session, if any. Rejections
/// and local failures are recorded in `report` instead.
pub async fn upload_directory(
    session: &mut dyn IRemoteSession,
    root: &Path,
    dir: &RelativePath,
    report: &mut UploadReport,
) -> Result<(), TransportError> {
    info!(path = %dir, "Uploading directory");
    make_remote_directory(session, dir, report).await?;

    let tree = match scanner::scan_tree(root, dir).await {
        Ok(tree) => tree,
        Err(SyncError::IoError(err)) if err.kind() == ErrorKind::NotFound => {
            info!(path = %dir, "Local directory vanished before upload, skipping");
            return Ok(());
        }
        Err(err) => {
            warn!(path = %dir, error = %err, "Cannot read local directory");
            report.fail(dir, UploadStep::ReadLocal, err);
            return Ok(());
        }
    };

    for subdir in &tree.directories {
        make_remote_directory(session, subdir, report).await?;
    }

    for file in &tree.files {
        upload_file(session, root, file, report).await?;
    }

    Ok(())
}

/// Stores one local file at the same relative path remotely
///
/// A file that no longer exists locally is skipped without error.
///
/// # Errors
/// Returns the transport error that ended the session, if any
pub async fn upload_file(
    session: &mut dyn IRemoteSession,
    root: &Path,
    file: &RelativePath,
    report: &mut UploadReport,
) -> Result<(), TransportError> {
    let local = file.to_local(root);
    let mut handle = match tokio::fs::File::open(&local).await {
        Ok(handle) => handle,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %file, "Local file vanished before upload, skipping");
            report.files_skipped.push(file.clone());
            return Ok(());
        }
        Err(err) => {
            warn!(path = %file, error = %err, "Cannot open local file");
            report.fail(file, UploadStep::ReadLocal, err);
            return Ok(());
        }
    };

    match session.store_file(file.as_str(), &mut handle).await {
        Ok(bytes) => {
            debug!(path = %file, bytes, "File uploaded");
            report.files_uploaded.push(file.clone());
            report.bytes_uploaded += bytes;
            Ok(())
        }
        Err(err) if err.is_rejection() => {
            warn!(path = %file, error = %err, "Upload rejected");
            report.fail(file, UploadStep::StoreFile, &err);
            Ok(())
        }
        Err(err) => {
            warn!(path = %file, error = %err, "Upload failed, session lost");
            report.fail(file, UploadStep::StoreFile, &err);
            Err(err)
        }
    }
}

async fn make_remote_directory(
    session: &mut dyn IRemoteSession,
    dir: &RelativePath,
    report: &mut UploadReport,
) -> Result<(), TransportError> {
    match session.make_directory(dir.as_str()).await {
        Ok(()) => {
            info!(path = %dir, "Remote directory created");
            report.directories_created.push(dir.clone());
            Ok(())
        }
        Err(err) if err.is_rejection() => {
            debug!(path = %dir, error = %err, "Remote directory not created (already exists?)");
            report.directories_existing.push(dir.clone());
            Ok(())
        }
        Err(err) => {
            warn!(path = %dir, error = %err, "Directory create failed, session lost");
            report.fail(dir, UploadStep::MakeDirectory, &err);
            Err(err)
        }
    }
}
