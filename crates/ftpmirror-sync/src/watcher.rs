//! File watching and debounced change queue
//!
//! Provides a [`FileWatcher`] that wraps the `notify` crate to monitor the
//! local root for changes, converting raw OS events into [`ChangeEvent`]
//! values.
//!
//! The [`DebouncedChangeQueue`] collects rapid-fire events and releases
//! them as one batch once the whole burst has been quiet for the settle
//! delay.
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue
//!       │
//!       ▼
//!  FileWatcher  ──→  mpsc::channel  ──→  ChangeEventBridge  ──→  ReconciliationEngine
//!                                              │
//!                                     DebouncedChangeQueue
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

// ============================================================================
// ChangeEvent
// ============================================================================

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    /// Renamed or moved; the event path is the destination
    Moved,
    Removed,
}

/// A filesystem change detected by the watcher
///
/// This is the internal representation used by the bridge, decoupled from
/// the `notify` crate's raw event types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub is_directory: bool,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            is_directory,
        }
    }

    /// Returns the path associated with this event
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if this event should trigger a reconciliation
    ///
    /// Qualifying events are a created directory, a modified file and a
    /// moved file. Everything else is ignored.
    pub fn qualifies(&self) -> bool {
        matches!(
            (self.kind, self.is_directory),
            (ChangeKind::Created, true) | (ChangeKind::Modified, false) | (ChangeKind::Moved, false)
        )
    }
}

// ============================================================================
// FileWatcher
// ============================================================================

/// Watches the local root for changes using the OS-native mechanism
///
/// On Linux this typically uses inotify. The watcher converts raw OS events
/// into [`ChangeEvent`] values and sends them through an mpsc channel.
///
/// ## Usage
///
/// ```ignore
/// let (mut watcher, rx) = FileWatcher::new()?;
/// watcher.watch(Path::new("/srv/upload"))?;
/// // hand rx to a ChangeEventBridge
/// ```
pub struct FileWatcher {
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Creates a new `FileWatcher` and the receiver its events are sent to
    ///
    /// # Errors
    /// Returns an error if the underlying OS watcher cannot be created
    pub fn new() -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(1024);

        info!("Initializing file watcher");

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(change) = map_notify_event(&event) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            warn!(error = %e, "Failed to send change event (receiver dropped)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok((Self { watcher }, event_rx))
    }

    /// Starts watching a directory recursively for filesystem changes
    ///
    /// # Errors
    /// Returns an error if the path cannot be watched (e.g., does not exist,
    /// insufficient permissions, or inotify watch limit reached)
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Starting recursive watch");

        self.watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch path: {}", path.display()))
    }

    /// Stops watching a directory
    ///
    /// # Errors
    /// Returns an error if the path was not being watched
    pub fn unwatch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Stopping watch");

        self.watcher
            .unwatch(path)
            .with_context(|| format!("Failed to unwatch path: {}", path.display()))
    }
}

// ============================================================================
// Event mapping - notify::Event → ChangeEvent
// ============================================================================

/// Converts a `notify::Event` into our internal `ChangeEvent`
///
/// Maps the notify event kinds as follows:
/// - `Create(*)` -> `Created`
/// - `Modify(Name(Both))` with 2 paths -> `Moved` (destination path)
/// - `Modify(Name(From))` -> `Removed`
/// - Other `Modify(Name(*))` -> `Moved`
/// - Other `Modify(*)` -> `Modified`
/// - `Remove(*)` -> `Removed`
///
/// Whether the path is a directory comes from the event kind when notify
/// reports it, and from the filesystem otherwise. Returns `None` for events
/// without paths and for access events.
fn map_notify_event(event: &notify::Event) -> Option<ChangeEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(kind) => {
            let path = paths.first()?;
            let is_directory = match kind {
                CreateKind::Folder => true,
                CreateKind::File => false,
                _ => path.is_dir(),
            };
            debug!(path = %path.display(), is_directory, "Mapped Create event");
            Some(ChangeEvent::new(ChangeKind::Created, path, is_directory))
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            let new = &paths[1];
            debug!(
                old = %paths[0].display(),
                new = %new.display(),
                "Mapped Rename event"
            );
            Some(ChangeEvent::new(ChangeKind::Moved, new, new.is_dir()))
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped rename source as Removed");
            Some(ChangeEvent::new(ChangeKind::Removed, path, false))
        }

        EventKind::Modify(ModifyKind::Name(_)) => {
            let path = paths.last()?;
            debug!(path = %path.display(), "Mapped rename destination as Moved");
            Some(ChangeEvent::new(ChangeKind::Moved, path, path.is_dir()))
        }

        EventKind::Modify(_) => {
            let path = paths.first()?;
            debug!(path = %path.display(), kind = ?event.kind, "Mapped Modify event");
            Some(ChangeEvent::new(ChangeKind::Modified, path, path.is_dir()))
        }

        EventKind::Remove(kind) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped Remove event");
            Some(ChangeEvent::new(
                ChangeKind::Removed,
                path,
                matches!(kind, RemoveKind::Folder),
            ))
        }

        // Ignore access events and other event types
        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            None
        }
    }
}

// ============================================================================
// DebouncedChangeQueue
// ============================================================================

/// Queue that coalesces a burst of filesystem changes into one batch
///
/// Each push records the event (the latest one wins per path) and restarts
/// the settle window. [`poll`](DebouncedChangeQueue::poll) releases the
/// whole batch only once no event has arrived for the settle delay, so a
/// long copy into the watched tree produces a single trigger at its end.
pub struct DebouncedChangeQueue {
    /// Pending changes keyed by path
    pending: HashMap<PathBuf, ChangeEvent>,
    /// When the most recent event was pushed
    last_event_at: Option<Instant>,
    /// Quiet period required before the batch is released
    settle_delay: Duration,
}

impl DebouncedChangeQueue {
    /// Creates a new queue with the given settle delay
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            last_event_at: None,
            settle_delay,
        }
    }

    /// Inserts or updates the change for the event's path and restarts the window
    pub fn push(&mut self, event: ChangeEvent) {
        debug!(
            path = %event.path.display(),
            event = ?event.kind,
            "Enqueuing change event"
        );
        self.pending.insert(event.path.clone(), event);
        self.last_event_at = Some(Instant::now());
    }

    /// When the current batch will have settled, or `None` if the queue is empty
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.last_event_at.map(|at| at + self.settle_delay)
    }

    /// Returns the whole batch if it has settled, otherwise nothing
    ///
    /// Settled events are removed from the queue and returned sorted by path.
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        match self.deadline() {
            Some(deadline) if Instant::now() >= deadline => self.drain(),
            _ => Vec::new(),
        }
    }

    /// Returns every pending event regardless of the settle window
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut settled: Vec<ChangeEvent> = self.pending.drain().map(|(_, e)| e).collect();
        settled.sort_by(|a, b| a.path.cmp(&b.path));
        self.last_event_at = None;

        if !settled.is_empty() {
            debug!(count = settled.len(), "Released settled change events");
        }
        settled
    }

    /// Returns the number of pending (unsettled) events
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if there are no pending events
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
