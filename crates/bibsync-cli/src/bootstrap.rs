//! Wiring shared by the commands
//!
//! Loads configuration, opens the local store, builds the remote client and
//! resolves which user and groups to synchronize.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use bibsync_core::config::{Config, API_KEY_ENV};
use bibsync_core::domain::{Group, UserIdentity};
use bibsync_remote::provider::ZoteroRemoteLibrary;
use bibsync_store::{DatabasePool, SqliteLibraryStore};

/// Loads the configuration file
///
/// A missing file yields the defaults unless `required` is set (the path was
/// given explicitly). A file that exists but does not parse is an error.
pub fn load_config(path: &Path, required: bool) -> Result<Config> {
    if !path.exists() {
        if required {
            bail!("Configuration file not found: {}", path.display());
        }
        return Ok(Config::default());
    }

    Config::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Fails with every validation error joined into one message
pub fn ensure_valid(config: &Config) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }

    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    bail!("Invalid configuration: {}", messages.join("; "))
}

/// Opens (and migrates) the SQLite store
pub async fn open_store(config: &Config) -> Result<SqliteLibraryStore> {
    let pool = DatabasePool::new(&config.storage.database)
        .await
        .context("Failed to open database")?;
    Ok(SqliteLibraryStore::new(pool.pool().clone()))
}

/// Builds the remote adapter from configuration
///
/// Without an API key only public libraries can be read, which still
/// requires an explicit `remote.user_id`.
pub fn connect_remote(config: &Config) -> Result<ZoteroRemoteLibrary> {
    let api_key = config.api_key();

    if api_key.is_none() {
        if config.remote.user_id.is_none() {
            bail!(
                "No API key configured. Set remote.api_key in the config file or {}.",
                API_KEY_ENV
            );
        }
        warn!("No API key configured; only public data will be visible");
    }

    Ok(ZoteroRemoteLibrary::from_config(&config.remote, api_key))
}

/// The configured user, or the owner of the API key
pub async fn resolve_user(remote: &ZoteroRemoteLibrary, config: &Config) -> Result<UserIdentity> {
    if let Some(user_id) = config.remote.user_id {
        return Ok(UserIdentity::new(user_id));
    }

    let user = remote
        .current_user()
        .await
        .context("Failed to resolve the user owning the API key")?;
    info!(user = %user.id, username = ?user.username, "Resolved user from API key");
    Ok(user)
}

/// Group memberships to synchronize, or none when groups are disabled
pub async fn resolve_groups(
    remote: &ZoteroRemoteLibrary,
    user: &UserIdentity,
    include_groups: bool,
) -> Result<Vec<Group>> {
    if !include_groups {
        return Ok(Vec::new());
    }

    remote
        .user_groups(&user.id)
        .await
        .context("Failed to list group memberships")
}
