//! CLI subcommands and the helpers they share

pub mod config;
pub mod plan;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ftpmirror_core::config::Config;
use ftpmirror_core::ports::IRemoteConnector;
use ftpmirror_ftp::connector::FtpConnector;
use ftpmirror_sync::ReconciliationEngine;

/// Loads the configuration and applies environment overrides
///
/// An explicit path must exist; the default path falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    let (mut config, path) = match explicit {
        Some(path) => (Config::load(path)?, path.to_path_buf()),
        None => {
            let path = Config::default_path();
            let config = if path.exists() {
                Config::load(&path)?
            } else {
                debug!(config_path = %path.display(), "No configuration file, using defaults");
                Config::default()
            };
            (config, path)
        }
    };
    config.apply_env_overrides();
    info!(config_path = %path.display(), "Loaded configuration");
    Ok((config, path))
}

/// Loads and validates the configuration, then builds an engine for it
///
/// The engine abandons connection retries when Ctrl+C is pressed.
pub fn engine_from_config(explicit: Option<&Path>) -> Result<ReconciliationEngine> {
    let (config, path) = load_config(explicit)?;

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!(
            "Invalid configuration in {}: {}",
            path.display(),
            details.join("; ")
        );
    }

    let connector: Arc<dyn IRemoteConnector> = Arc::new(FtpConnector::new(&config.remote));
    Ok(ReconciliationEngine::from_config(connector, &config.sync).with_shutdown(ctrl_c_token()))
}

/// A token cancelled on Ctrl+C
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    token
}

/// Human-readable duration
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms >= 1000 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", duration_ms)
    }
}
