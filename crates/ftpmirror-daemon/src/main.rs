//! ftpmirror Daemon - Background mirroring service
//!
//! This binary runs as a long-lived user service and handles:
//! - Periodic polling of the remote FTP root
//! - Uploading local directories that are missing remotely
//! - Reacting to local filesystem changes
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! ```text
//! FileWatcher ──→ ChangeEventBridge ──→ ReconciliationEngine ──→ FtpConnector
//!                                            ▲
//!                                     poll interval
//! ```
//!
//! Every task shares one `CancellationToken`, triggered on receipt of
//! SIGTERM or SIGINT. The engine finishes any pass in flight, closes the
//! FTP session and returns its final state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ftpmirror_core::config::{Config, LoggingConfig};
use ftpmirror_core::domain::MonitorState;
use ftpmirror_core::ports::IRemoteConnector;
use ftpmirror_ftp::connector::FtpConnector;
use ftpmirror_sync::{ChangeEventBridge, FileWatcher, ReconciliationEngine};

/// Capacity of the queue between the change bridge and the engine
const COMMAND_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Parser)]
#[command(
    name = "ftpmirrord",
    version,
    about = "Mirror a local directory tree onto an FTP server"
)]
struct Args {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,
}

// ============================================================================
// DaemonService
// ============================================================================

/// Wires the watcher, the change bridge and the engine together
struct DaemonService {
    /// Validated configuration
    config: Config,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Runs until the shutdown token is cancelled
    ///
    /// 1. Ensures the local root exists and starts watching it
    /// 2. Spawns the change bridge
    /// 3. Runs the reconciliation engine on this task
    async fn run(&self) -> Result<MonitorState> {
        let root = self.config.sync.resolved_root();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create local root {}", root.display()))?;

        let connector: Arc<dyn IRemoteConnector> =
            Arc::new(FtpConnector::new(&self.config.remote));
        info!(
            root = %root.display(),
            endpoint = %connector.endpoint(),
            "Mirroring local root to remote"
        );

        let (mut watcher, change_rx) = FileWatcher::new()?;
        watcher.watch(&root)?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let bridge = ChangeEventBridge::new(change_rx, command_tx, self.config.sync.settle_delay());
        let bridge_task = tokio::spawn(bridge.run(self.shutdown.clone()));

        let engine = ReconciliationEngine::from_config(connector, &self.config.sync)
            .with_shutdown(self.shutdown.clone());
        let state = engine.run(command_rx, self.shutdown.clone()).await;

        // Dropping the watcher closes the change channel
        drop(watcher);
        if let Err(err) = bridge_task.await {
            warn!(error = %err, "Change bridge task ended abnormally");
        }

        Ok(state)
    }
}

// ============================================================================
// Configuration and logging
// ============================================================================

/// Loads, overrides and validates the configuration
///
/// An explicit path must exist. The default path may be absent, in which
/// case defaults are used.
fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    let (mut config, path) = match explicit {
        Some(path) => (Config::load(path)?, path.to_path_buf()),
        None => {
            let path = Config::default_path();
            let config = if path.exists() {
                Config::load(&path)?
            } else {
                Config::default()
            };
            (config, path)
        }
    };

    config.apply_env_overrides();

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!(
            "Invalid configuration in {}: {}",
            path.display(),
            details.join("; ")
        );
    }

    Ok((config, path))
}

/// Installs the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
///
/// If a handler cannot be installed that signal is simply never observed.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_path) = load_config(args.config.as_deref())?;

    init_tracing(&config.logging);
    info!(config_path = %config_path.display(), "ftpmirror daemon starting (ftpmirrord)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token);
    let result = service.run().await;

    match &result {
        Ok(state) => info!(phase = %state.phase(), "ftpmirror daemon shut down gracefully"),
        Err(e) => error!(error = %e, "ftpmirror daemon exiting with error"),
    }

    result.map(drop)
}

// ============================================================================
// Tests
// ============================================================================
