//! Sync command - Run one reconciliation pass
//!
//! Provides the `ftpmirror sync` CLI command which connects, lists the
//! remote root, uploads every missing local directory and exits. It is the
//! same pass the daemon runs, without the watcher or the poll loop.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use ftpmirror_sync::PassReport;

use super::{engine_from_config, format_duration};
use crate::output::{get_formatter, plural, OutputFormat};

/// Sync command
#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let mut engine = engine_from_config(config_path)?;

        formatter.info(&format!("Connecting to {} (Ctrl+C to abort)...", engine.endpoint()));
        let result = engine.reconcile_now().await;
        engine.close().await;
        let report = result.context("Reconciliation pass failed")?;

        if format.is_json() {
            formatter.print_json(&report_to_json(&report));
            return Ok(());
        }

        let upload = &report.upload;
        if report.pending.is_empty() {
            formatter.success("Already up to date");
        } else {
            formatter.success(&format!(
                "Sync completed in {}",
                format_duration(report.duration_ms)
            ));
        }

        if !upload.directories_created.is_empty() {
            formatter.info(&format!(
                "Created:  {}",
                plural(upload.directories_created.len(), "directory", "directories")
            ));
        }
        if !upload.files_uploaded.is_empty() {
            formatter.info(&format!(
                "Uploaded: {} ({} bytes)",
                plural(upload.files_uploaded.len(), "file", "files"),
                upload.bytes_uploaded
            ));
        }
        if !upload.files_skipped.is_empty() {
            formatter.info(&format!(
                "Skipped:  {} (removed locally)",
                plural(upload.files_skipped.len(), "file", "files")
            ));
        }

        if !upload.failures.is_empty() {
            formatter.error(&format!(
                "{} occurred:",
                plural(upload.failures.len(), "error", "errors")
            ));
            for failure in &upload.failures {
                formatter.info(&format!(
                    "  - {} ({}): {}",
                    failure.path, failure.step, failure.cause
                ));
            }
        }

        Ok(())
    }
}

fn report_to_json(report: &PassReport) -> serde_json::Value {
    let upload = &report.upload;
    let strings = |paths: &[ftpmirror_core::domain::RelativePath]| -> Vec<String> {
        paths.iter().map(|p| p.as_str().to_string()).collect()
    };
    let failures: Vec<serde_json::Value> = upload
        .failures
        .iter()
        .map(|f| {
            serde_json::json!({
                "path": f.path.as_str(),
                "step": f.step.to_string(),
                "cause": f.cause,
            })
        })
        .collect();

    serde_json::json!({
        "trigger": report.trigger.to_string(),
        "pending": strings(&report.pending),
        "directories_created": strings(&upload.directories_created),
        "directories_existing": strings(&upload.directories_existing),
        "files_uploaded": strings(&upload.files_uploaded),
        "files_skipped": strings(&upload.files_skipped),
        "bytes_uploaded": upload.bytes_uploaded,
        "failures": failures,
        "duration_ms": report.duration_ms,
    })
}
