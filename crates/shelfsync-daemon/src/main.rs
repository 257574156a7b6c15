//! ShelfSync Daemon - background synchronization service
//!
//! Runs as a long-lived process (typically under systemd) that reconciles
//! Audiobookshelf listening progress into Hardcover reading state for every
//! configured profile, on each profile's own schedule.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shelfsyncd", version, about = "ShelfSync background synchronization daemon")]
struct Args {
    /// Path to the configuration file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the daemon's data directory (profiles db, state, secret key)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the encryption key file path
    #[arg(long)]
    encryption_key: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: pretty or json
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(shelfsync_core::config::Config::default_path);
    let mut config = shelfsync_core::config::Config::load_or_default(&config_path);

    if let Some(data_dir) = args.data_dir {
        config.daemon.data_dir = data_dir;
    }
    if let Some(key_path) = args.encryption_key {
        config.daemon.encryption_key_path = Some(key_path);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging);

    shelfsync_daemon::run(config).await
}

fn init_tracing(logging: &shelfsync_core::config::LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    if logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
    }
}
