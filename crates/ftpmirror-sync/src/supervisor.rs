//! Reconnection supervisor
//!
//! The [`ReconnectionSupervisor`] is the only owner of the remote session.
//! It hands out a mutable borrow of a live session, and when none exists it
//! keeps connecting with a fixed delay between attempts until one succeeds
//! or shutdown is requested. There is no backoff growth and no attempt
//! limit: a lost server is retried for as long as the process runs.
//!
//! ```text
//! ensure_connected ──→ connect() ──ok──→ session
//!        ▲                 │
//!        └── sleep(delay) ←┘ err (logged)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ftpmirror_core::ports::{IRemoteConnector, IRemoteSession};

use crate::SyncError;

/// Owns the remote session and re-establishes it on demand
pub struct ReconnectionSupervisor {
    connector: Arc<dyn IRemoteConnector>,
    session: Option<Box<dyn IRemoteSession>>,
    retry_delay: Duration,
    /// Failed connection attempts since the supervisor was created
    failed_attempts: u64,
}

impl ReconnectionSupervisor {
    /// Creates a supervisor with no session
    ///
    /// # Arguments
    /// * `connector` - Opens new authenticated sessions
    /// * `retry_delay` - Fixed wait between failed connection attempts
    pub fn new(connector: Arc<dyn IRemoteConnector>, retry_delay: Duration) -> Self {
        Self {
            connector,
            session: None,
            retry_delay,
            failed_attempts: 0,
        }
    }

    /// Human-readable address of the remote store
    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    /// Returns true if a session is currently held
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Total number of failed connection attempts
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts
    }

    /// Returns the live session, connecting first if necessary
    ///
    /// Blocks until a session is established. Between failed attempts it
    /// waits `retry_delay`; the wait is cut short by `shutdown`.
    ///
    /// # Errors
    /// Returns `SyncError::Stopped` if shutdown is requested before a
    /// session could be established. Connection failures are never
    /// returned; they are logged and retried.
    pub async fn ensure_connected(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<&mut dyn IRemoteSession, SyncError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.connect_with_retry(shutdown).await?,
        };
        Ok(&mut **self.session.insert(session))
    }

    /// Returns the live session without connecting
    pub fn session_mut(&mut self) -> Option<&mut dyn IRemoteSession> {
        match self.session.as_mut() {
            Some(session) => Some(&mut **session),
            None => None,
        }
    }

    /// Discards the current session without talking to the server
    ///
    /// Used after a transport error, when the connection can no longer be
    /// trusted. The next [`ensure_connected`](Self::ensure_connected)
    /// opens a fresh one.
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            warn!(endpoint = %self.connector.endpoint(), "Remote session discarded");
        }
    }

    /// Closes the current session politely, if any
    ///
    /// Errors while closing are logged and otherwise ignored.
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => info!(endpoint = %self.connector.endpoint(), "Disconnected"),
                Err(err) => debug!(error = %err, "Error while closing session (ignored)"),
            }
        }
    }

    async fn connect_with_retry(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<Box<dyn IRemoteSession>, SyncError> {
        let endpoint = self.connector.endpoint();
        let mut attempt: u64 = 0;

        loop {
            if shutdown.is_cancelled() {
                return Err(SyncError::Stopped);
            }
            attempt += 1;

            match self.connector.connect().await {
                Ok(session) => {
                    info!(%endpoint, attempt, "Connected to remote store");
                    return Ok(session);
                }
                Err(err) => {
                    self.failed_attempts += 1;
                    warn!(
                        %endpoint,
                        attempt,
                        error = %err,
                        retry_in_secs = self.retry_delay.as_secs_f64(),
                        "Connection attempt failed"
                    );
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Err(SyncError::Stopped),
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }
}
