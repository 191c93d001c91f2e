//! ZoteroRemoteLibrary - IRemoteLibrary implementation for the Zotero Web API
//!
//! Wraps the [`ZoteroClient`] and delegates to the delta and fetch modules to
//! fulfil the [`IRemoteLibrary`] port contract. Also exposes the account
//! queries the CLI needs to build the list of libraries to sync.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use bibsync_core::config::RemoteConfig;
use bibsync_core::domain::{Collection, EntityKey, Group, Item, Library, UserId, UserIdentity};
use bibsync_core::ports::{DeletionsResponse, IRemoteLibrary, VersionsResponse};

use crate::account;
use crate::client::ZoteroClient;
use crate::delta::{self, ObjectStream};
use crate::fetch;

/// Remote library adapter over the Zotero Web API
pub struct ZoteroRemoteLibrary {
    client: ZoteroClient,
    keys_per_request: usize,
}

impl ZoteroRemoteLibrary {
    /// Creates an adapter over an existing client
    pub fn new(client: ZoteroClient, keys_per_request: usize) -> Self {
        Self {
            client,
            keys_per_request,
        }
    }

    /// Creates an adapter from the `remote` configuration section
    ///
    /// `api_key` is passed separately since it may come from the environment.
    pub fn from_config(config: &RemoteConfig, api_key: Option<String>) -> Self {
        let client = ZoteroClient::with_base_url(api_key, config.base_url.clone())
            .with_max_retries(config.max_retries);
        Self::new(client, config.keys_per_request)
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &ZoteroClient {
        &self.client
    }

    /// Identity of the user owning the API key
    pub async fn current_user(&self) -> Result<UserIdentity> {
        account::current_key(&self.client).await
    }

    /// Groups the user is a member of
    pub async fn user_groups(&self, user: &UserId) -> Result<Vec<Group>> {
        account::user_groups(&self.client, user).await
    }
}

#[async_trait]
impl IRemoteLibrary for ZoteroRemoteLibrary {
    async fn deletions(
        &self,
        library: &Library,
        since: u64,
    ) -> Result<Option<DeletionsResponse>> {
        delta::get_deletions(&self.client, &library.id(), since).await
    }

    async fn collection_versions(
        &self,
        library: &Library,
        since: u64,
    ) -> Result<Option<VersionsResponse>> {
        delta::get_versions(&self.client, &library.id(), ObjectStream::Collections, since).await
    }

    async fn collections(&self, library: &Library, keys: &[EntityKey]) -> Result<Vec<Collection>> {
        debug!(library = %library.id(), count = keys.len(), "Fetching collections");
        fetch::fetch_collections(&self.client, &library.id(), keys, self.keys_per_request).await
    }

    async fn item_versions(
        &self,
        library: &Library,
        since: u64,
    ) -> Result<Option<VersionsResponse>> {
        delta::get_versions(&self.client, &library.id(), ObjectStream::Items, since).await
    }

    async fn items(&self, library: &Library, keys: &[EntityKey]) -> Result<Vec<Item>> {
        debug!(library = %library.id(), count = keys.len(), "Fetching items");
        fetch::fetch_items(&self.client, &library.id(), keys, self.keys_per_request).await
    }
}
