//! ShelfSync CLI - command-line interface for the ShelfSync daemon
//!
//! Exposes the daemon-control surface only: starting the daemon in the
//! foreground, managing the systemd user unit, and shell completions.
//! Profile management and sync triggering are served by the daemon's
//! external HTTP layer, not by this CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::completions::CompletionsCommand;
use commands::daemon::DaemonCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "shelfsync", version, about = "ShelfSync daemon control CLI")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Path to the configuration file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the daemon's data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the encryption key file path
    #[arg(long, global = true)]
    encryption_key: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: pretty or json
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the daemon in the foreground (for debugging or non-systemd hosts)
    Run,
    /// Manage the ShelfSync background daemon
    #[command(subcommand)]
    Daemon(DaemonCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Human };

    match cli.command {
        Commands::Run => run_foreground(cli.config, cli.data_dir, cli.encryption_key, cli.log_level, cli.log_format).await,
        Commands::Daemon(cmd) => cmd.execute(format).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    }
}

async fn run_foreground(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    encryption_key: Option<PathBuf>,
    log_level: Option<String>,
    log_format: Option<String>,
) -> Result<()> {
    let config_path = config_path.unwrap_or_else(shelfsync_core::config::Config::default_path);
    let mut config = shelfsync_core::config::Config::load_or_default(&config_path);

    if let Some(data_dir) = data_dir {
        config.daemon.data_dir = data_dir;
    }
    if let Some(key_path) = encryption_key {
        config.daemon.encryption_key_path = Some(key_path);
    }
    if let Some(level) = log_level {
        config.logging.level = level;
    }
    if let Some(fmt) = log_format {
        config.logging.format = fmt;
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
    }

    shelfsync_daemon::run(config).await
}
