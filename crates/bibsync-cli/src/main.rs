//! bibsync CLI - Command-line interface for bibsync
//!
//! Provides commands for:
//! - Running a sync cycle over the personal and group libraries
//! - Viewing stored library status
//! - Polling continuously until interrupted
//! - Viewing and editing configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bibsync_core::config::Config;

mod bootstrap;
mod commands;
mod output;

use commands::{
    config::ConfigCommand, status::StatusCommand, sync::SyncCommand, watch::WatchCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "bibsync",
    version,
    about = "Incremental sync for Zotero-style reference libraries"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
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
    /// Synchronize all libraries once
    Sync(SyncCommand),
    /// Show stored library status
    Status(StatusCommand),
    /// Synchronize periodically until interrupted
    Watch(WatchCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Installs the tracing subscriber
///
/// `RUST_LOG` wins; otherwise `-v` raises the configured level. Logs go to
/// stderr so JSON output on stdout stays machine-readable.
fn init_tracing(verbose: u8, configured_level: &str, json: bool) {
    let level = match verbose {
        0 => configured_level,
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let loaded = bootstrap::load_config(&config_path, cli.config.is_some());
    let level = loaded
        .as_ref()
        .map(|config| config.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    init_tracing(cli.verbose, &level, cli.json);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
        Commands::Sync(cmd) => cmd.execute(&loaded?, format).await,
        Commands::Status(cmd) => cmd.execute(&loaded?, format).await,
        Commands::Watch(cmd) => cmd.execute(&loaded?, format).await,
    }
}
