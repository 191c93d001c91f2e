//! Status command - Display stored library state
//!
//! Lists every library stored for the user with its cursors, entity counts
//! and last sync time. Only the local database is read, except when the user
//! has to be resolved from the API key.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use bibsync_core::config::Config;
use bibsync_core::ports::ILibraryStore;

use crate::bootstrap;
use crate::output::{get_formatter, print_libraries, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if !config.storage.database.exists() {
            formatter.error("No database found. Run 'bibsync sync' first.");
            return Ok(());
        }

        let user_id = match config.remote.user_id {
            Some(id) => id,
            None => {
                let remote = bootstrap::connect_remote(config)?;
                bootstrap::resolve_user(&remote, config).await?.id
            }
        };

        let store = bootstrap::open_store(config).await?;
        let libraries = store
            .list_libraries(&user_id)
            .await
            .context("Failed to list stored libraries")?;

        info!(user = %user_id, libraries = libraries.len(), "Showing status");
        print_libraries(&libraries, format, &*formatter)
    }
}
