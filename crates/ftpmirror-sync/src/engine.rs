//! Reconciliation engine
//!
//! The [`ReconciliationEngine`] is the single owner of the remote session
//! (through its [`ReconnectionSupervisor`]) and of the [`MonitorState`].
//! Both trigger sources, the poll tick and settled local changes, reach it
//! through one loop, so transport calls are never issued concurrently.
//!
//! ## Passes
//!
//! - **Poll**: list the remote root; if the directory set differs from the
//!   last known one, replace it and reconcile against it.
//! - **Local change**: reconcile against the last known remote set without
//!   listing again. The remote view may lag behind; the next poll catches
//!   up.
//! - **Manual**: list, then reconcile unconditionally.
//!
//! A reconciliation pass scans the local root, plans `local − remote` and
//! uploads each pending directory. When the session is lost mid-pass the
//! remaining directories are left for the next successful poll.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ftpmirror_core::config::SyncConfig;
use ftpmirror_core::domain::{
    DirectorySnapshot, LocalDirectorySet, MonitorPhase, MonitorState, RelativePath,
};
use ftpmirror_core::ports::{IRemoteConnector, TransportError};

use crate::supervisor::ReconnectionSupervisor;
use crate::uploader::{self, UploadReport};
use crate::{delta, planner, scanner, snapshot, SyncError};

// ============================================================================
// Commands and reports
// ============================================================================

/// Requests delivered to a running engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// A burst of local changes has settled
    LocalChange {
        /// Absolute paths reported by the watcher
        paths: Vec<PathBuf>,
    },
    /// List the remote side and reconcile immediately
    ReconcileNow,
}

/// What started a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    Poll,
    LocalChange,
    Manual,
}

impl std::fmt::Display for PassTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PassTrigger::Poll => "poll",
            PassTrigger::LocalChange => "local_change",
            PassTrigger::Manual => "manual",
        })
    }
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone)]
pub struct PassReport {
    pub trigger: PassTrigger,
    /// Local directories missing from the remote snapshot (`local − remote`)
    pub pending: Vec<RelativePath>,
    /// Outcome of the uploads
    pub upload: UploadReport,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

impl PassReport {
    fn log(&self) {
        info!(
            trigger = %self.trigger,
            pending = self.pending.len(),
            directories_created = self.upload.directories_created.len(),
            directories_existing = self.upload.directories_existing.len(),
            files_uploaded = self.upload.files_uploaded.len(),
            files_skipped = self.upload.files_skipped.len(),
            bytes = self.upload.bytes_uploaded,
            failures = self.upload.failures.len(),
            duration_ms = self.duration_ms,
            "Reconciliation pass complete"
        );
        for failure in &self.upload.failures {
            warn!(
                path = %failure.path,
                step = %failure.step,
                cause = %failure.cause,
                "Upload failed"
            );
        }
    }
}

/// What a pass would do, without doing it
#[derive(Debug, Clone)]
pub struct Plan {
    /// Directories currently under the remote root
    pub remote: DirectorySnapshot,
    /// Every local directory
    pub local: LocalDirectorySet,
    /// `local − remote`
    pub pending: Vec<RelativePath>,
    /// Pending directories that would actually be walked (ancestors only)
    pub targets: Vec<RelativePath>,
}

// ============================================================================
// ReconciliationEngine
// ============================================================================

/// Keeps the remote tree in step with a local root
pub struct ReconciliationEngine {
    root: PathBuf,
    supervisor: ReconnectionSupervisor,
    state: MonitorState,
    poll_interval: Duration,
    /// Set when a pass could not finish; forces the next poll to reconcile
    needs_reconcile: bool,
    shutdown: CancellationToken,
}

impl ReconciliationEngine {
    /// Creates an idle engine
    ///
    /// # Arguments
    /// * `connector` - Opens sessions against the remote store
    /// * `root` - Local directory to mirror
    /// * `poll_interval` - Time between remote listings
    /// * `reconnect_delay` - Fixed wait between failed connection attempts
    pub fn new(
        connector: Arc<dyn IRemoteConnector>,
        root: impl Into<PathBuf>,
        poll_interval: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        let root = root.into();
        info!(
            root = %root.display(),
            endpoint = %connector.endpoint(),
            poll_secs = poll_interval.as_secs_f64(),
            "Creating reconciliation engine"
        );

        Self {
            root,
            supervisor: ReconnectionSupervisor::new(connector, reconnect_delay),
            state: MonitorState::new(),
            poll_interval,
            needs_reconcile: false,
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates an engine from the `sync` configuration section
    pub fn from_config(connector: Arc<dyn IRemoteConnector>, config: &SyncConfig) -> Self {
        Self::new(
            connector,
            config.resolved_root(),
            config.poll_interval(),
            config.reconnect_delay(),
        )
    }

    /// Uses `shutdown` to abandon connection retries
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn endpoint(&self) -> String {
        self.supervisor.endpoint()
    }

    // ------------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------------

    /// Lists the remote side and reconciles if it changed
    ///
    /// # Returns
    /// The pass report, or `None` when nothing changed and no earlier pass
    /// is outstanding.
    ///
    /// # Errors
    /// Transport errors invalidate the session and leave the last snapshot
    /// untouched. `SyncError::Stopped` if shutdown interrupted reconnection.
    pub async fn poll_once(&mut self) -> Result<Option<PassReport>, SyncError> {
        self.ensure_session().await?;
        if self.refresh_snapshot().await? {
            self.needs_reconcile = true;
        }

        if !self.needs_reconcile {
            debug!("Remote unchanged");
            return Ok(None);
        }
        self.reconcile_pass(PassTrigger::Poll).await.map(Some)
    }

    /// Lists the remote side and reconciles whether or not it changed
    pub async fn reconcile_now(&mut self) -> Result<PassReport, SyncError> {
        self.ensure_session().await?;
        self.refresh_snapshot().await?;
        self.needs_reconcile = true;
        self.reconcile_pass(PassTrigger::Manual).await
    }

    /// Reconciles after local changes, against the last known remote set
    ///
    /// The remote side is only listed when no snapshot exists yet.
    pub async fn handle_local_change(
        &mut self,
        paths: &[PathBuf],
    ) -> Result<PassReport, SyncError> {
        debug!(count = paths.len(), "Handling local change");
        self.ensure_session().await?;
        if self.state.last_remote_snapshot().is_none() {
            self.refresh_snapshot().await?;
        }
        self.needs_reconcile = true;
        self.reconcile_pass(PassTrigger::LocalChange).await
    }

    /// Lists the remote side and reports what a pass would upload
    pub async fn dry_run(&mut self) -> Result<Plan, SyncError> {
        self.ensure_session().await?;
        self.refresh_snapshot().await?;

        let remote = self
            .state
            .last_remote_snapshot()
            .cloned()
            .unwrap_or_default();
        let local = scanner::scan_local_directories(&self.root).await?;
        let pending = planner::plan_uploads(&local, &remote);
        let targets = planner::collapse_nested(pending.clone());

        Ok(Plan {
            remote,
            local,
            pending,
            targets,
        })
    }

    /// Closes the session and enters the terminal phase
    pub async fn close(&mut self) {
        self.supervisor.disconnect().await;
        self.state.stop();
    }

    // ------------------------------------------------------------------------
    // Worker loop
    // ------------------------------------------------------------------------

    /// Runs until `shutdown` is cancelled
    ///
    /// Polls every `poll_interval` (the first poll is immediate) and serves
    /// `commands` in between. Cancellation is observed between passes; a
    /// pass already in flight finishes first. If `commands` closes the
    /// engine keeps polling.
    ///
    /// # Returns
    /// The final monitor state (always `Stopped`)
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        shutdown: CancellationToken,
    ) -> MonitorState {
        self.shutdown = shutdown.clone();
        info!(endpoint = %self.supervisor.endpoint(), "Reconciliation engine starting");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            let flow = tokio::select! {
                biased;

                _ = shutdown.cancelled() => ControlFlow::Break(()),

                command = commands.recv(), if commands_open => match command {
                    Some(EngineCommand::LocalChange { paths }) => {
                        let result = self.handle_local_change(&paths).await;
                        settle(result.map(drop))
                    }
                    Some(EngineCommand::ReconcileNow) => {
                        let result = self.reconcile_now().await;
                        settle(result.map(drop))
                    }
                    None => {
                        debug!("Command channel closed, continuing with polls only");
                        commands_open = false;
                        ControlFlow::Continue(())
                    }
                },

                _ = ticker.tick() => {
                    let result = self.poll_once().await;
                    settle(result.map(drop))
                }
            };

            if flow.is_break() {
                break;
            }
        }

        info!("Shutdown requested, stopping reconciliation engine");
        self.close().await;
        info!(phase = %self.state.phase(), "Reconciliation engine stopped");
        self.state
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Makes sure a session is live, moving through `Connecting`
    async fn ensure_session(&mut self) -> Result<(), SyncError> {
        if !self.state.is_running() {
            return Err(SyncError::Stopped);
        }
        if self.supervisor.is_connected() {
            return Ok(());
        }

        self.state.transition_to(MonitorPhase::Connecting)?;
        self.supervisor.ensure_connected(&self.shutdown).await?;
        self.state.transition_to(MonitorPhase::Polling)?;
        Ok(())
    }

    /// Lists the remote root and stores the snapshot
    ///
    /// Returns true if it differs from the previous one (or there was none).
    async fn refresh_snapshot(&mut self) -> Result<bool, SyncError> {
        let session = self.supervisor.session_mut().ok_or_else(|| {
            SyncError::Transport(TransportError::Connection("no live session".to_string()))
        })?;

        match snapshot::build_snapshot(session).await {
            Ok(current) => {
                let changed =
                    delta::snapshot_changed(self.state.last_remote_snapshot(), &current);
                if changed {
                    let directories: Vec<&str> = current.iter().collect();
                    info!(
                        count = current.len(),
                        ?directories,
                        "Remote directories changed"
                    );
                }
                self.state.replace_snapshot(current);
                Ok(changed)
            }
            Err(err) => {
                warn!(error = %err, "Remote listing failed, keeping last snapshot");
                self.lose_session();
                Err(err.into())
            }
        }
    }

    /// Scans, plans and uploads against the cached snapshot
    async fn reconcile_pass(&mut self, trigger: PassTrigger) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        let remote = self
            .state
            .last_remote_snapshot()
            .cloned()
            .unwrap_or_default();

        let local = scanner::scan_local_directories(&self.root)
            .await
            .inspect_err(|err| {
                warn!(root = %self.root.display(), error = %err, "Cannot scan local root");
            })?;
        let pending = planner::plan_uploads(&local, &remote);
        let targets = planner::collapse_nested(pending.clone());
        debug!(
            %trigger,
            pending = pending.len(),
            targets = targets.len(),
            "Upload plan computed"
        );

        let mut upload = UploadReport::default();
        if !targets.is_empty() {
            self.state.transition_to(MonitorPhase::Uploading)?;

            let lost = match self.supervisor.session_mut() {
                Some(session) => {
                    let mut lost = None;
                    for dir in &targets {
                        if let Err(err) =
                            uploader::upload_directory(session, &self.root, dir, &mut upload)
                                .await
                        {
                            lost = Some(err);
                            break;
                        }
                    }
                    lost
                }
                None => Some(TransportError::Connection("no live session".to_string())),
            };

            if let Some(err) = lost {
                let report = PassReport {
                    trigger,
                    pending,
                    upload,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                report.log();
                warn!(error = %err, "Session lost during upload, pass will be retried");
                self.lose_session();
                return Err(err.into());
            }

            self.state.transition_to(MonitorPhase::Polling)?;
        }

        self.needs_reconcile = false;
        let report = PassReport {
            trigger,
            pending,
            upload,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        report.log();
        Ok(report)
    }

    /// Drops the session after a transport failure
    fn lose_session(&mut self) {
        self.supervisor.invalidate();
        self.needs_reconcile = true;
        if let Err(err) = self.state.transition_to(MonitorPhase::Disconnected) {
            debug!(error = %err, "Phase not changed");
        }
    }
}

/// Maps a pass outcome onto the worker loop
fn settle(result: Result<(), SyncError>) -> ControlFlow<()> {
    match result {
        Ok(()) => ControlFlow::Continue(()),
        Err(SyncError::Stopped) => ControlFlow::Break(()),
        Err(err) => {
            warn!(error = %err, "Reconciliation pass failed");
            ControlFlow::Continue(())
        }
    }
}
