//! Sync command - Run one synchronization cycle
//!
//! Provides the `bibsync sync` CLI command which:
//! 1. Resolves the user (configured or from the API key) and their groups
//! 2. Plans, merges and persists every library
//! 3. Prints the per-library report

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use bibsync_core::config::Config;
use bibsync_sync::{SyncEngine, SyncOptions};

use crate::bootstrap;
use crate::output::{get_formatter, print_report, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Ignore stored cursors and rebuild every library from scratch
    #[arg(long)]
    pub full: bool,

    /// Plan and merge without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only synchronize the personal library
    #[arg(long)]
    pub no_groups: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        bootstrap::ensure_valid(config)?;
        let remote = Arc::new(bootstrap::connect_remote(config)?);
        let store = Arc::new(bootstrap::open_store(config).await?);

        let user = bootstrap::resolve_user(&remote, config).await?;
        let groups =
            bootstrap::resolve_groups(&remote, &user, config.sync.include_groups && !self.no_groups)
                .await?;

        let options = SyncOptions {
            full_resync: self.full,
            dry_run: self.dry_run,
        };
        info!(
            user = %user.id,
            groups = groups.len(),
            full_resync = options.full_resync,
            dry_run = options.dry_run,
            "Running sync"
        );

        let engine = SyncEngine::new(remote, store, &config.sync);
        let report = engine.sync_all(&user, &groups, options).await;

        print_report(&report, format, &*formatter)?;

        if report.has_failures() {
            bail!(
                "{} of {} libraries failed to sync",
                report.failures().count(),
                report.libraries.len()
            );
        }
        Ok(())
    }
}
