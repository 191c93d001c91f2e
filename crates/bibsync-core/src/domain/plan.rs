//! Sync plans
//!
//! A [`LibrarySyncPlan`] is the output of delta planning: the deletions and
//! updates to apply to one library, plus the cursor values to record once
//! they are applied. It is pure data and is handed immutably to the merge.

use indexmap::{IndexMap, IndexSet};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use super::entity::{Collection, Entity, Item};
use super::library::GroupMetadata;
use super::newtypes::EntityKey;
use super::versions::VersionCursor;

/// Deletions and updates computed for one entity type in one cycle
///
/// Invariant: a key never appears both in `deleted_keys` and in `updated`.
/// Deletion wins: marking a key deleted drops any pending update for it, and
/// updates for already-deleted keys are ignored.
///
/// Updates are indexed by key. A deletion empties the update's slot instead
/// of shifting the remaining entries, so both operations are O(1).
#[derive(Debug, Clone)]
pub struct SyncActionSet<T> {
    deleted_keys: IndexSet<EntityKey>,
    /// Updates in arrival order; `None` once superseded by a deletion
    updated: IndexMap<EntityKey, Option<T>>,
    live_updates: usize,
}

impl<T> Default for SyncActionSet<T> {
    fn default() -> Self {
        Self {
            deleted_keys: IndexSet::new(),
            updated: IndexMap::new(),
            live_updates: 0,
        }
    }
}

impl<T: Entity> SyncActionSet<T> {
    /// Creates an empty action set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an action set from raw parts, enforcing deletion precedence
    pub fn from_parts(
        deleted_keys: impl IntoIterator<Item = EntityKey>,
        updated: impl IntoIterator<Item = T>,
    ) -> Self {
        let mut set = Self::new();
        for key in deleted_keys {
            set.mark_deleted(key);
        }
        for entity in updated {
            set.push_updated(entity);
        }
        set
    }

    /// Records a deletion, dropping any pending update for the same key
    pub fn mark_deleted(&mut self, key: EntityKey) {
        if let Some(slot) = self.updated.get_mut(&key) {
            if slot.take().is_some() {
                self.live_updates -= 1;
            }
        }
        self.deleted_keys.insert(key);
    }

    /// Records an update unless the key is already marked deleted
    ///
    /// A second update for the same key replaces the first in place.
    /// Returns false when the update was dropped.
    pub fn push_updated(&mut self, entity: T) -> bool {
        if self.deleted_keys.contains(entity.key()) {
            return false;
        }
        let key = entity.key().clone();
        if !matches!(self.updated.insert(key, Some(entity)), Some(Some(_))) {
            self.live_updates += 1;
        }
        true
    }

    /// Keys to remove, in the order they were recorded
    pub fn deleted_keys(&self) -> &IndexSet<EntityKey> {
        &self.deleted_keys
    }

    /// Entities to insert or replace, in remote order
    pub fn updated(&self) -> impl Iterator<Item = &T> + '_ {
        self.updated.values().flatten()
    }

    /// Number of entities to insert or replace
    pub fn update_count(&self) -> usize {
        self.live_updates
    }

    /// Returns true if the set has neither deletions nor updates
    pub fn is_empty(&self) -> bool {
        self.deleted_keys.is_empty() && self.live_updates == 0
    }

    /// Total number of recorded actions
    pub fn len(&self) -> usize {
        self.deleted_keys.len() + self.live_updates
    }
}

impl<T: Entity + PartialEq> PartialEq for SyncActionSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deleted_keys == other.deleted_keys && self.updated().eq(other.updated())
    }
}

impl<T: Entity + Serialize> Serialize for SyncActionSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let updated: Vec<&T> = self.updated().collect();
        let mut state = serializer.serialize_struct("SyncActionSet", 2)?;
        state.serialize_field("deleted_keys", &self.deleted_keys)?;
        state.serialize_field("updated", &updated)?;
        state.end()
    }
}

/// Output of delta planning for one library
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibrarySyncPlan {
    /// Updated group metadata, when it changed this cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_group_metadata: Option<GroupMetadata>,
    /// Cursor values to record after the plan is applied
    pub next_versions: VersionCursor,
    /// Collection actions
    pub collections: SyncActionSet<Collection>,
    /// Item actions
    pub items: SyncActionSet<Item>,
}

impl LibrarySyncPlan {
    /// A plan with no actions that keeps the given cursor
    pub fn empty(versions: VersionCursor) -> Self {
        Self {
            library_group_metadata: None,
            next_versions: versions,
            collections: SyncActionSet::new(),
            items: SyncActionSet::new(),
        }
    }
}

/// Returns true iff applying the plan would change the snapshot's content
///
/// True when group metadata is present or any of the four deletion/update
/// sets is non-empty. Used to skip a no-op persistence write.
#[must_use]
pub fn has_changes(plan: &LibrarySyncPlan) -> bool {
    plan.library_group_metadata.is_some()
        || !plan.collections.is_empty()
        || !plan.items.is_empty()
}
