//! Config command - View and check ftpmirror configuration
//!
//! Provides the `ftpmirror config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON), password masked
//! 2. Validates the configuration file and reports errors

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use ftpmirror_core::config::Config;

use super::load_config;
use crate::output::{get_formatter, plural, OutputFormat};

/// Replacement shown instead of a configured password
const MASK: &str = "********";

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
        }
    }
}

fn execute_show(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let (config, path) = load_config(config_path)?;
    let config = masked(config);

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_validate(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    let (config, path) = match load_config(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "errors": [format!("{:#}", e)],
                }));
            } else {
                formatter.error(&format!("{:#}", e));
            }
            return Ok(());
        }
    };

    info!(config_path = %path.display(), "Validating configuration");
    let errors = config.validate();

    if format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {}:",
            plural(errors.len(), "error", "errors")
        ));
        formatter.info(&format!("File: {}", path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

/// Hides the password before the configuration is printed
fn masked(mut config: Config) -> Config {
    if !config.remote.password.is_empty() {
        config.remote.password = MASK.to_string();
    }
    config
}
