//! Materialized local state of one library

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::entity::{Collection, Entity, Item};
use super::library::GroupMetadata;
use super::newtypes::EntityKey;
use super::versions::VersionCursor;

/// The currently-applied collections and items of one library
///
/// Created empty with zero cursors on first sync and replaced as a whole by
/// each successful merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    /// Group metadata, for group libraries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_metadata: Option<GroupMetadata>,
    /// Cursors this snapshot reflects
    pub versions: VersionCursor,
    /// Collections in replica order
    pub collections: Vec<Collection>,
    /// Items in replica order
    pub items: Vec<Item>,
}

impl LibrarySnapshot {
    /// The empty snapshot of a library that was never synced
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the snapshot holds no entities
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.items.is_empty()
    }

    /// Looks up a collection by key
    pub fn collection(&self, key: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.key.as_str() == key)
    }

    /// Looks up an item by key
    pub fn item(&self, key: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.key.as_str() == key)
    }

    /// Returns true if no key occurs twice within either sequence
    pub fn has_unique_keys(&self) -> bool {
        unique_keys(&self.collections) && unique_keys(&self.items)
    }
}

fn unique_keys<T: Entity>(entities: &[T]) -> bool {
    let mut seen: HashSet<&EntityKey> = HashSet::with_capacity(entities.len());
    entities.iter().all(|e| seen.insert(e.key()))
}
