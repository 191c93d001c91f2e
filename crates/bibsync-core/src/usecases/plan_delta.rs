//! Delta planning use case
//!
//! Queries the remote for everything that changed in one library since its
//! last-applied cursors and assembles a [`LibrarySyncPlan`]. Three change
//! streams are read: the deletion feed, collection changes and item changes.
//! They share no data, so the three queries run concurrently and are joined
//! before the plan is assembled.

use std::sync::Arc;

use futures_util::future::try_join3;

use crate::{
    domain::{
        versions::next_version, Collection, EntityKey, GroupMetadata, Item, Library,
        LibrarySyncError, LibrarySyncPlan, QueryStage, SyncActionSet, VersionCursor,
    },
    ports::IRemoteLibrary,
};

/// Result of the deletion-feed query
#[derive(Debug, Default)]
struct DeletionDelta {
    version: u64,
    collections: Vec<EntityKey>,
    items: Vec<EntityKey>,
}

/// Result of a changed-keys query plus the follow-up fetch
#[derive(Debug)]
struct EntityDelta<T> {
    version: u64,
    fetched: Vec<T>,
}

impl<T> EntityDelta<T> {
    fn unchanged(version: u64) -> Self {
        Self {
            version,
            fetched: Vec::new(),
        }
    }
}

/// Use case for planning one library's incremental sync
///
/// The plan is all-or-nothing: if any remote query fails, the partial
/// results of the others are discarded and a
/// [`LibrarySyncError::RemoteQueryFailed`] naming the failing stage is
/// returned. Nothing is persisted here, so a failed plan leaves the stored
/// cursors untouched.
pub struct PlanDeltaUseCase {
    remote: Arc<dyn IRemoteLibrary + Send + Sync>,
}

impl PlanDeltaUseCase {
    /// Creates a new PlanDeltaUseCase over the given remote
    pub fn new(remote: Arc<dyn IRemoteLibrary + Send + Sync>) -> Self {
        Self { remote }
    }

    /// Plans the changes to apply to `library` since `last`
    ///
    /// # Arguments
    ///
    /// * `library` - The library to plan
    /// * `last` - Last-applied cursors (zero for a first sync or full resync)
    /// * `group_metadata` - Group metadata to record with the plan, if it changed
    ///
    /// # Returns
    ///
    /// A plan whose `next_versions` follow the version fallback rule for each
    /// stream. Deletions take precedence over updates: a key listed by the
    /// deletion feed, or an item whose fetched payload marks itself deleted,
    /// only ever appears in `deleted_keys`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteQueryFailed` if any of the remote calls fails
    pub async fn execute(
        &self,
        library: &Library,
        last: &VersionCursor,
        group_metadata: Option<GroupMetadata>,
    ) -> Result<LibrarySyncPlan, LibrarySyncError> {
        let (deletions, collections, items) = try_join3(
            self.query_deletions(library, last.deleted),
            self.query_collections(library, last.collections),
            self.query_items(library, last.items),
        )
        .await?;

        let mut plan = LibrarySyncPlan {
            library_group_metadata: group_metadata,
            next_versions: VersionCursor::new(
                collections.version,
                items.version,
                deletions.version,
            ),
            collections: SyncActionSet::new(),
            items: SyncActionSet::new(),
        };

        for key in deletions.collections {
            plan.collections.mark_deleted(key);
        }
        for key in deletions.items {
            plan.items.mark_deleted(key);
        }

        for collection in collections.fetched {
            plan.collections.push_updated(collection);
        }
        for item in items.fetched {
            if item.is_deleted() {
                plan.items.mark_deleted(item.key);
            } else {
                plan.items.push_updated(item);
            }
        }

        Ok(plan)
    }

    async fn query_deletions(
        &self,
        library: &Library,
        since: u64,
    ) -> Result<DeletionDelta, LibrarySyncError> {
        let response = self
            .remote
            .deletions(library, since)
            .await
            .map_err(remote_failure(library, QueryStage::Deletions))?;

        Ok(match response {
            Some(response) => DeletionDelta {
                version: next_version(since, response.version),
                collections: response.data.collections,
                items: response.data.items,
            },
            None => DeletionDelta {
                version: since,
                ..DeletionDelta::default()
            },
        })
    }

    async fn query_collections(
        &self,
        library: &Library,
        since: u64,
    ) -> Result<EntityDelta<Collection>, LibrarySyncError> {
        let Some(delta) = self
            .remote
            .collection_versions(library, since)
            .await
            .map_err(remote_failure(library, QueryStage::CollectionVersions))?
        else {
            return Ok(EntityDelta::unchanged(since));
        };

        // Keys are fetched even when the response carries no version
        let keys = delta.keys();
        let fetched = if keys.is_empty() {
            Vec::new()
        } else {
            self.remote
                .collections(library, &keys)
                .await
                .map_err(remote_failure(library, QueryStage::Collections))?
        };

        Ok(EntityDelta {
            version: next_version(since, delta.version),
            fetched,
        })
    }

    async fn query_items(
        &self,
        library: &Library,
        since: u64,
    ) -> Result<EntityDelta<Item>, LibrarySyncError> {
        let Some(delta) = self
            .remote
            .item_versions(library, since)
            .await
            .map_err(remote_failure(library, QueryStage::ItemVersions))?
        else {
            return Ok(EntityDelta::unchanged(since));
        };

        let keys = delta.keys();
        let fetched = if keys.is_empty() {
            Vec::new()
        } else {
            self.remote
                .items(library, &keys)
                .await
                .map_err(remote_failure(library, QueryStage::Items))?
        };

        Ok(EntityDelta {
            version: next_version(since, delta.version),
            fetched,
        })
    }
}

fn remote_failure(
    library: &Library,
    stage: QueryStage,
) -> impl FnOnce(anyhow::Error) -> LibrarySyncError {
    let library = library.id();
    move |source| LibrarySyncError::RemoteQueryFailed {
        library,
        stage,
        source,
    }
}
