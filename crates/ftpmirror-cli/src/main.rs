//! ftpmirror CLI - Command-line interface for ftpmirror
//!
//! Provides commands for:
//! - Viewing and validating configuration
//! - Previewing which local directories are missing remotely
//! - Running a single reconciliation pass

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, plan::PlanCommand, sync::SyncCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "ftpmirror",
    version,
    about = "Mirror a local directory tree onto an FTP server"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// View and check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show which local directories would be uploaded
    Plan(PlanCommand),
    /// Run one reconciliation pass and exit
    Sync(SyncCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(config_path, format).await,
        Commands::Plan(cmd) => cmd.execute(config_path, format).await,
        Commands::Sync(cmd) => cmd.execute(config_path, format).await,
    }
}
