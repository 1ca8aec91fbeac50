//! Remote store port (driven/secondary port)
//!
//! This module defines the capability interface the reconciliation engine
//! uses to talk to the remote directory tree. The production implementation
//! is an FTP client, but nothing here is FTP-specific.
//!
//! ## Design Notes
//!
//! - A session is stateful: it has a *current directory*, and
//!   [`IRemoteSession::list_current_directory`] lists only that directory.
//! - Methods take `&mut self` because a session is owned by exactly one
//!   caller at a time; sharing happens by passing ownership, never by
//!   concurrent access.
//! - All failures collapse into [`TransportError`]. The only distinction the
//!   engine cares about is whether the server *rejected* a single request
//!   (the session is still usable) or whether the session itself is gone.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

// ============================================================================
// TransportError
// ============================================================================

/// Errors reported by a remote store adapter
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server could not be reached or the connection dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server refused the supplied credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The server rejected a single request (permanent negative reply)
    ///
    /// Typical causes are "not a directory" when entering a file and
    /// "already exists" when creating a directory twice.
    #[error("Rejected by server ({code}): {message}")]
    Rejected {
        /// Protocol reply code
        code: u16,
        /// Reply text as sent by the server
        message: String,
    },

    /// The server refused a request for now (transient negative reply)
    ///
    /// The request may succeed later, so its outcome is unknown and the
    /// session is discarded rather than treating the target as refused.
    #[error("Temporarily unavailable ({code}): {message}")]
    Unavailable {
        /// Protocol reply code
        code: u16,
        /// Reply text as sent by the server
        message: String,
    },

    /// The server sent something the adapter could not understand
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An operation exceeded its configured time bound
    #[error("Timed out during {0}")]
    Timeout(String),

    /// A socket-level I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Returns true if the server rejected one request but the session is intact
    pub fn is_rejection(&self) -> bool {
        matches!(self, TransportError::Rejected { .. })
    }

    /// Returns true if the session must be discarded and re-established
    pub fn invalidates_session(&self) -> bool {
        !self.is_rejection()
    }
}

// ============================================================================
// IRemoteSession
// ============================================================================

/// An authenticated connection to the remote store
#[async_trait]
pub trait IRemoteSession: Send {
    /// Lists the names of the entries in the current remote directory
    async fn list_current_directory(&mut self) -> Result<Vec<String>, TransportError>;

    /// Enters the child directory `name`
    ///
    /// Fails with [`TransportError::Rejected`] when `name` is not a directory.
    async fn change_directory(&mut self, name: &str) -> Result<(), TransportError>;

    /// Returns to the parent of the current directory
    async fn change_directory_up(&mut self) -> Result<(), TransportError>;

    /// Creates a directory at `path`, relative to the current directory
    ///
    /// Fails with [`TransportError::Rejected`] when it already exists.
    async fn make_directory(&mut self, path: &str) -> Result<(), TransportError>;

    /// Streams `reader` to `remote_path`, replacing any existing file
    ///
    /// # Returns
    /// The number of bytes sent
    async fn store_file(
        &mut self,
        remote_path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, TransportError>;

    /// Ends the session politely
    async fn close(&mut self) -> Result<(), TransportError>;
}

// ============================================================================
// IRemoteConnector
// ============================================================================

/// Opens new sessions against one configured remote store
#[async_trait]
pub trait IRemoteConnector: Send + Sync {
    /// Connects and authenticates, returning a ready-to-use session
    ///
    /// Implementations never return a half-initialised session: if login
    /// fails the underlying connection is dropped before returning.
    async fn connect(&self) -> Result<Box<dyn IRemoteSession>, TransportError>;

    /// Human-readable address used in log messages
    fn endpoint(&self) -> String;
}
