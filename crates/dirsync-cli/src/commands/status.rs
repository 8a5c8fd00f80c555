//! Status command - report the last known state of a running engine
//!
//! This CLI has no daemon or IPC layer, so "status" means reading the
//! snapshot a running `start` invocation last wrote to disk: whether it's
//! running or idle, and the last error it hit, if any.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::output::{get_formatter, OutputFormat};
use crate::status_file;

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Status file to read, matching the `--status-file` a `start` was given
    #[arg(long)]
    pub status_file: Option<PathBuf>,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let path = self.status_file.clone().unwrap_or_else(status_file::default_path);

        let Some(snapshot) = status_file::read(&path).await? else {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({"running": false, "known": false}));
            } else {
                formatter.info("idle (no engine has run yet)");
            }
            return Ok(());
        };

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "running": snapshot.running,
                "mode": snapshot.mode,
                "root_a": snapshot.root_a,
                "root_b": snapshot.root_b,
                "last_error": snapshot.last_error,
            }));
            return Ok(());
        }

        if snapshot.running {
            formatter.success(&format!(
                "running: {} <-> {} ({})",
                snapshot.root_a, snapshot.root_b, snapshot.mode
            ));
        } else {
            formatter.info(&format!(
                "idle (last ran: {} <-> {}, {})",
                snapshot.root_a, snapshot.root_b, snapshot.mode
            ));
        }

        if let Some(err) = &snapshot.last_error {
            formatter.error(err);
        }

        Ok(())
    }
}
