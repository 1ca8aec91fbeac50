//! Remote snapshot builder
//!
//! Lists the session's current directory (the remote root) and keeps the
//! entries that can be entered. Only the top level is inspected.

use tracing::{debug, trace};

use ftpmirror_core::domain::DirectorySnapshot;
use ftpmirror_core::ports::{IRemoteSession, TransportError};

/// Builds a snapshot of the directories directly under the current remote directory
///
/// Each listed entry is classified by trying to enter it: success means it
/// is a directory (the session immediately steps back up), a rejection
/// means it is a file and it is skipped. Any other error, including a
/// transient refusal to enter a directory, aborts the whole
/// snapshot so that a partial result is never returned.
///
/// # Errors
/// Returns the first non-rejection [`TransportError`] encountered
pub async fn build_snapshot(
    session: &mut dyn IRemoteSession,
) -> Result<DirectorySnapshot, TransportError> {
    let names = session.list_current_directory().await?;
    let mut snapshot = DirectorySnapshot::new();

    for name in names {
        match session.change_directory(&name).await {
            Ok(()) => {
                session.change_directory_up().await?;
                snapshot.insert(name);
            }
            Err(err) if err.is_rejection() => {
                trace!(%name, error = %err, "Not a directory, skipping");
            }
            Err(err) => return Err(err),
        }
    }

    debug!(directories = snapshot.len(), "Remote snapshot built");
    Ok(snapshot)
}
