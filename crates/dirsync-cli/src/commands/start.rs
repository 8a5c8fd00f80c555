//! Start command - run the replication engine in the foreground
//!
//! A thin driver that supplies two paths and a mode, then calls the
//! engine's `start` / `stop`: this command is a text-mode stand-in for a
//! GUI shell that would otherwise hand the core the same two paths. It
//! blocks until Ctrl-C, then stops the engine cleanly.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use dirsync_core::domain::{Mode as EngineMode, SyncConfig};
use dirsync_engine::Engine;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};
use crate::status_file::{self, StatusSnapshot};

/// How often the running engine refreshes the on-disk status snapshot that
/// `dirsync status` reads.
const STATUS_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Replicate `a` onto `b` only.
    AtoB,
    /// Replicate `b` onto `a` only.
    BtoA,
    /// Replicate both directions, suppressing echoes.
    Mirror,
}

impl From<ModeArg> for EngineMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::AtoB => EngineMode::AtoB,
            ModeArg::BtoA => EngineMode::BtoA,
            ModeArg::Mirror => EngineMode::Mirror,
        }
    }
}

#[derive(Debug, Args)]
pub struct StartCommand {
    /// Replication direction
    #[arg(long, value_enum)]
    pub mode: ModeArg,

    /// First watched directory
    pub root_a: PathBuf,

    /// Second watched directory
    pub root_b: PathBuf,

    /// Override the default debounce interval, in milliseconds
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Where to persist the status snapshot `dirsync status` reads
    #[arg(long)]
    pub status_file: Option<PathBuf>,
}

impl StartCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let mode: EngineMode = self.mode.into();
        let mut config = SyncConfig::new(mode, self.root_a.clone(), self.root_b.clone());
        if let Some(ms) = self.debounce_ms {
            config = config.with_debounce_interval(Duration::from_millis(ms));
        }

        let status_path = self.status_file.clone().unwrap_or_else(status_file::default_path);

        let mut engine = Engine::new();
        engine
            .start(config.clone())
            .await
            .context("failed to start replication engine")?;

        info!(
            mode = ?config.mode,
            root_a = %self.root_a.display(),
            root_b = %self.root_b.display(),
            "replication engine running"
        );
        formatter.success(&format!(
            "syncing {} <-> {} ({:?})",
            self.root_a.display(),
            self.root_b.display(),
            config.mode
        ));
        formatter.info("press Ctrl-C to stop");

        let mut ticker = tokio::time::interval(STATUS_REFRESH_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = StatusSnapshot::from_status(
                        &engine.status(),
                        &format!("{:?}", config.mode),
                        &self.root_a,
                        &self.root_b,
                    );
                    if let Err(e) = status_file::write(&status_path, &snapshot).await {
                        tracing::warn!(error = %e, "failed to refresh status file");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    break;
                }
            }
        }

        formatter.info("stopping...");
        engine.stop().await.context("failed to stop replication engine")?;

        let snapshot = StatusSnapshot::from_status(
            &engine.status(),
            &format!("{:?}", config.mode),
            &self.root_a,
            &self.root_b,
        );
        let _ = status_file::write(&status_path, &snapshot).await;

        formatter.success("stopped");
        Ok(())
    }
}
