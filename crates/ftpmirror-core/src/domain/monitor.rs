//! Monitor state owned by the reconciliation engine
//!
//! [`MonitorState`] replaces process-wide flags with explicit state: the
//! current [`MonitorPhase`] and the last remote snapshot obtained from a
//! *successful* full listing.
//!
//! ## Phase machine
//!
//! ```text
//! Idle → Connecting → Polling ⇄ Uploading
//!            ↑           │          │
//!            └── Disconnected ←─────┘
//!
//! any phase ──(shutdown)──→ Stopped
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::snapshot::DirectorySnapshot;

/// Process-level phase of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    /// Created but not started
    Idle,
    /// Opening and authenticating a session (possibly retrying)
    Connecting,
    /// Connected; listing the remote side on each tick
    Polling,
    /// Connected; creating directories and storing files
    Uploading,
    /// The session was lost and has been discarded
    Disconnected,
    /// Terminal: shutdown was requested
    Stopped,
}

impl MonitorPhase {
    /// Returns the lowercase name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            MonitorPhase::Idle => "idle",
            MonitorPhase::Connecting => "connecting",
            MonitorPhase::Polling => "polling",
            MonitorPhase::Uploading => "uploading",
            MonitorPhase::Disconnected => "disconnected",
            MonitorPhase::Stopped => "stopped",
        }
    }

    /// Returns true if a session is expected to be live in this phase
    pub fn is_connected(&self) -> bool {
        matches!(self, MonitorPhase::Polling | MonitorPhase::Uploading)
    }

    /// Whether the machine may move from `self` to `target`
    pub fn can_transition_to(&self, target: MonitorPhase) -> bool {
        use MonitorPhase::*;

        if *self == Stopped {
            return false;
        }
        if target == Stopped {
            return true;
        }

        matches!(
            (self, target),
            (Idle, Connecting)
                | (Connecting, Connecting)
                | (Connecting, Polling)
                | (Polling, Polling)
                | (Polling, Uploading)
                | (Polling, Disconnected)
                | (Uploading, Polling)
                | (Uploading, Disconnected)
                | (Disconnected, Connecting)
        )
    }
}

impl std::fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable state of one running monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorState {
    phase: MonitorPhase,
    last_remote_snapshot: Option<DirectorySnapshot>,
    last_snapshot_at: Option<DateTime<Utc>>,
}

impl MonitorState {
    /// Creates a new state in the `Idle` phase with no known snapshot
    pub fn new() -> Self {
        Self {
            phase: MonitorPhase::Idle,
            last_remote_snapshot: None,
            last_snapshot_at: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// False once shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.phase != MonitorPhase::Stopped
    }

    /// Moves to `target`, rejecting transitions the phase machine forbids
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if the transition is not allowed.
    pub fn transition_to(&mut self, target: MonitorPhase) -> Result<(), DomainError> {
        if !self.phase.can_transition_to(target) {
            return Err(DomainError::InvalidState {
                from: self.phase.name().to_string(),
                to: target.name().to_string(),
            });
        }
        self.phase = target;
        Ok(())
    }

    /// Enters the terminal `Stopped` phase (idempotent)
    pub fn stop(&mut self) {
        self.phase = MonitorPhase::Stopped;
    }

    /// The snapshot from the last successful full listing, if any
    pub fn last_remote_snapshot(&self) -> Option<&DirectorySnapshot> {
        self.last_remote_snapshot.as_ref()
    }

    /// When the last snapshot was recorded
    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.last_snapshot_at
    }

    /// Replaces the cached snapshot
    ///
    /// Callers only hand over a snapshot built from a complete listing;
    /// a failed or partial listing never reaches this method.
    pub fn replace_snapshot(&mut self, snapshot: DirectorySnapshot) {
        self.last_remote_snapshot = Some(snapshot);
        self.last_snapshot_at = Some(Utc::now());
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}
