//! ftpmirror Sync - reconciliation engine
//!
//! Provides:
//! - A reconnection supervisor owning the single remote session
//! - Remote snapshots and change detection
//! - Local tree scanning, upload planning and recursive uploads
//! - A debounced bridge from filesystem notifications to the engine
//!
//! ## Modules
//!
//! - [`engine`] - Single-owner worker driving poll and local-change passes
//! - [`supervisor`] - Session ownership and fixed-delay reconnection
//! - [`snapshot`] / [`delta`] - Remote listing and comparison
//! - [`scanner`] / [`planner`] / [`uploader`] - Local side of a pass
//! - [`watcher`] / [`bridge`] - Filesystem notifications into engine commands

pub mod bridge;
pub mod delta;
pub mod engine;
pub mod planner;
pub mod scanner;
pub mod snapshot;
pub mod supervisor;
pub mod uploader;
pub mod watcher;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use bridge::ChangeEventBridge;
pub use engine::{EngineCommand, PassReport, PassTrigger, Plan, ReconciliationEngine};
pub use uploader::{UploadFailure, UploadReport, UploadStep};
pub use watcher::{ChangeEvent, ChangeKind, FileWatcher};

use thiserror::Error;

use ftpmirror_core::domain::errors::DomainError;
use ftpmirror_core::ports::TransportError;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred on the local side
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The remote store failed or the session was lost
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A domain-level error propagated from ftpmirror-core
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    /// Shutdown was requested before the operation could finish
    #[error("Shutdown requested")]
    Stopped,
}

impl SyncError {
    /// Returns true if the error came from the remote store
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}
