//! Remote library port (driven/secondary port)
//!
//! This module defines the interface for querying the remote source of
//! truth. The primary implementation targets the Zotero Web API v3, but the
//! trait only assumes cursor-based delta queries plus fetch-by-keys.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   (network, auth, decoding) and are classified by the planner.
//! - A delta query returns `Ok(None)` when the remote reports no changes since
//!   the given version. This is distinct from an empty `Some` response.
//! - Response `version` is optional: some remotes do not echo a version number.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::{Collection, EntityKey, Item, Library};

/// Keys deleted since a version, per entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedKeys {
    /// Deleted collection keys
    #[serde(default)]
    pub collections: Vec<EntityKey>,
    /// Deleted item keys
    #[serde(default)]
    pub items: Vec<EntityKey>,
}

/// Response of the deletion feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionsResponse {
    /// Library version the response reflects, when reported
    pub version: Option<u64>,
    /// Deleted keys
    pub data: DeletedKeys,
}

/// Response of a changed-keys query: key → per-key version, in remote order
///
/// The per-key versions are only used to drive the follow-up fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionsResponse {
    /// Library version the response reflects, when reported
    pub version: Option<u64>,
    /// Changed keys with their interim versions
    pub data: IndexMap<EntityKey, u64>,
}

impl VersionsResponse {
    /// Changed keys in remote order
    pub fn keys(&self) -> Vec<EntityKey> {
        self.data.keys().cloned().collect()
    }
}

/// Port trait for remote library queries
///
/// ## Implementation Notes
///
/// - `collections` and `items` must return entities in the order of `keys`
///   (missing keys are simply absent).
/// - `items` must include items whose payload is marked deleted; the planner
///   relies on seeing them to classify implicit deletions.
/// - Retries for throttling belong to the implementation; any returned error
///   aborts the library's plan.
#[async_trait::async_trait]
pub trait IRemoteLibrary: Send + Sync {
    /// Entities deleted at or after `since`
    async fn deletions(
        &self,
        library: &Library,
        since: u64,
    ) -> anyhow::Result<Option<DeletionsResponse>>;

    /// Collection keys changed at or after `since`
    async fn collection_versions(
        &self,
        library: &Library,
        since: u64,
    ) -> anyhow::Result<Option<VersionsResponse>>;

    /// Full collection payloads for the given keys
    async fn collections(
        &self,
        library: &Library,
        keys: &[EntityKey],
    ) -> anyhow::Result<Vec<Collection>>;

    /// Item keys changed at or after `since`
    async fn item_versions(
        &self,
        library: &Library,
        since: u64,
    ) -> anyhow::Result<Option<VersionsResponse>>;

    /// Full item payloads for the given keys, including self-deleted items
    async fn items(&self, library: &Library, keys: &[EntityKey]) -> anyhow::Result<Vec<Item>>;
}
