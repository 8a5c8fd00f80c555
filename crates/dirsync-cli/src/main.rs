//! dirsync CLI - text-mode driver for the directory-sync engine
//!
//! Supplies two paths and a mode, then `start` / `stop`. No confirmation
//! dialogs, tray state, or path pickers — those belong to a GUI shell,
//! which is out of scope here.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod status_file;

use commands::start::StartCommand;
use commands::status::StatusCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "dirsync", version, about = "Continuous two-directory sync engine")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start replicating between two directories
    Start(StartCommand),
    /// Report whether an engine is running and its last error
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Human };

    match cli.command {
        Commands::Start(cmd) => cmd.execute(format).await,
        Commands::Status(cmd) => cmd.execute(format).await,
    }
}
