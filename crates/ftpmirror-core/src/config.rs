//! Configuration module for ftpmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `remote.password`.
pub const PASSWORD_ENV_VAR: &str = "FTPMIRROR_PASSWORD";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ftpmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Remote store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Host name or IP address of the FTP server.
    pub host: String,
    /// Control connection port.
    pub port: u16,
    /// Login user name.
    pub username: String,
    /// Login secret, handed to the transport unchanged.
    pub password: String,
    /// Seconds allowed for opening the control connection.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for any single command or transfer.
    pub io_timeout_secs: u64,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory mirrored to the remote root.
    pub root: PathBuf,
    /// Seconds between remote polling cycles.
    pub poll_interval_secs: u64,
    /// Seconds a burst of local changes must be quiet before reconciling.
    pub settle_delay_secs: u64,
    /// Seconds between reconnection attempts.
    pub reconnect_delay_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/ftpmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ftpmirror")
            .join("config.yaml")
    }

    /// Apply overrides taken from the process environment.
    ///
    /// Only the password can be overridden, so it does not have to live
    /// in the YAML file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(PASSWORD_ENV_VAR) {
            self.remote.password = password;
        }
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 21,
            username: "anonymous".to_string(),
            password: String::new(),
            connect_timeout_secs: 10,
            io_timeout_secs: 30,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("~/ftpmirror"),
            poll_interval_secs: 5,
            settle_delay_secs: 5,
            reconnect_delay_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl RemoteConfig {
    /// `host:port` string suitable for a socket connect.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

impl SyncConfig {
    /// The local root with a leading `~` expanded to the home directory.
    pub fn resolved_root(&self) -> PathBuf {
        expand_tilde(&self.root)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let mut positive = |field: &str, value: u64| {
            if value == 0 {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must be greater than 0".into(),
                });
            }
        };

        positive("remote.connect_timeout_secs", self.remote.connect_timeout_secs);
        positive("remote.io_timeout_secs", self.remote.io_timeout_secs);
        positive("sync.poll_interval_secs", self.sync.poll_interval_secs);
        positive("sync.settle_delay_secs", self.sync.settle_delay_secs);
        positive("sync.reconnect_delay_secs", self.sync.reconnect_delay_secs);

        // --- remote ---
        if self.remote.host.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.host".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.port == 0 {
            errors.push(ValidationError {
                field: "remote.port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.username.is_empty() {
            errors.push(ValidationError {
                field: "remote.username".into(),
                message: "must not be empty".into(),
            });
        }

        // --- sync ---
        // A missing root is created by the daemon; only an existing non-directory is fatal.
        let root = self.sync.resolved_root();
        if root.exists() && !root.is_dir() {
            errors.push(ValidationError {
                field: "sync.root".into(),
                message: format!("not a directory: {}", root.display()),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use ftpmirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .remote_host("192.168.50.129")
///     .remote_credentials("mike", "pi")
///     .sync_root(PathBuf::from("/srv/upload"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_host(mut self, host: impl Into<String>) -> Self {
        self.config.remote.host = host.into();
        self
    }

    pub fn remote_port(mut self, port: u16) -> Self {
        self.config.remote.port = port;
        self
    }

    pub fn remote_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.remote.username = username.into();
        self.config.remote.password = password.into();
        self
    }

    pub fn remote_connect_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.connect_timeout_secs = seconds;
        self
    }

    pub fn remote_io_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.io_timeout_secs = seconds;
        self
    }

    // --- sync ---

    pub fn sync_root(mut self, root: PathBuf) -> Self {
        self.config.sync.root = root;
        self
    }

    pub fn sync_poll_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval_secs = seconds;
        self
    }

    pub fn sync_settle_delay_secs(mut self, seconds: u64) -> Self {
        self.config.sync.settle_delay_secs = seconds;
        self
    }

    pub fn sync_reconnect_delay_secs(mut self, seconds: u64) -> Self {
        self.config.sync.reconnect_delay_secs = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
