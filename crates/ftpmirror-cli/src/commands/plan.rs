//! Plan command - Preview a reconciliation pass
//!
//! Provides the `ftpmirror plan` CLI command which connects, lists the
//! remote root and reports which local directories are missing remotely
//! without uploading anything.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use ftpmirror_sync::Plan;

use super::engine_from_config;
use crate::output::{get_formatter, plural, OutputFormat};

/// Plan command
#[derive(Debug, Args)]
pub struct PlanCommand {}

impl PlanCommand {
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let mut engine = engine_from_config(config_path)?;

        formatter.info(&format!("Connecting to {} (Ctrl+C to abort)...", engine.endpoint()));
        let plan = engine.dry_run().await.context("Failed to compute plan")?;
        engine.close().await;

        if format.is_json() {
            formatter.print_json(&plan_to_json(&plan));
            return Ok(());
        }

        formatter.success(&format!(
            "Remote has {}, local has {}",
            plural(plan.remote.len(), "directory", "directories"),
            plural(plan.local.len(), "directory", "directories")
        ));

        if plan.pending.is_empty() {
            formatter.info("Nothing to upload");
            return Ok(());
        }

        formatter.info(&format!(
            "Would upload {}:",
            plural(plan.targets.len(), "directory", "directories")
        ));
        for target in &plan.targets {
            let nested = plan
                .pending
                .iter()
                .filter(|p| p.is_descendant_of(target))
                .count();
            if nested == 0 {
                formatter.info(&format!("  {}/", target));
            } else {
                formatter.info(&format!(
                    "  {}/ (+{} nested)",
                    target,
                    plural(nested, "directory", "directories")
                ));
            }
        }

        Ok(())
    }
}

fn plan_to_json(plan: &Plan) -> serde_json::Value {
    let strings = |paths: &[ftpmirror_core::domain::RelativePath]| -> Vec<String> {
        paths.iter().map(|p| p.as_str().to_string()).collect()
    };
    serde_json::json!({
        "remote": plan.remote.iter().collect::<Vec<_>>(),
        "local": plan.local.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        "pending": strings(&plan.pending),
        "targets": strings(&plan.targets),
    })
}
