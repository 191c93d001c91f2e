//! Replica merge use case
//!
//! Applies a [`LibrarySyncPlan`] to a library's local snapshot. For each
//! entity type the merge removes deleted keys, removes keys that are about to
//! be re-inserted, then appends the updated entities in plan order. Entries
//! the plan does not touch keep their relative order; updated entries move to
//! the end.
//!
//! The merge is pure. Instead of logging, it returns the list of
//! [`AppliedAction`]s it performed so the caller decides how to surface them.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::domain::{
    Entity, EntityKey, LibrarySnapshot, LibrarySyncPlan, SyncActionSet,
};

/// Entity type an action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    Item,
}

/// One change performed by a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AppliedAction {
    /// An entity present in the snapshot was removed
    Removed { kind: EntityKind, key: EntityKey },
    /// An entity was inserted (`replaced == false`) or replaced
    Upserted {
        kind: EntityKind,
        key: EntityKey,
        version: u64,
        replaced: bool,
    },
    /// Group metadata was replaced
    GroupMetadataUpdated { name: String, version: u64 },
}

/// Result of [`merge_snapshot`]
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The next snapshot
    pub snapshot: LibrarySnapshot,
    /// Changes performed, in application order
    pub actions: Vec<AppliedAction>,
}

impl MergeOutcome {
    /// Number of removals
    pub fn removed(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, AppliedAction::Removed { .. }))
            .count()
    }

    /// Number of inserts and replacements
    pub fn upserted(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, AppliedAction::Upserted { .. }))
            .count()
    }
}

/// Produces the next snapshot by applying `plan` to `snapshot`
///
/// - Deletions of keys absent from the snapshot are no-ops.
/// - The result's `group_metadata` is the plan's when present, otherwise the
///   snapshot's.
/// - The result's `versions` are the plan's `next_versions`.
///
/// Re-applying the same plan to the result yields the same snapshot.
#[must_use]
pub fn merge_snapshot(snapshot: &LibrarySnapshot, plan: &LibrarySyncPlan) -> MergeOutcome {
    let mut actions = Vec::new();

    let collections = merge_sequence(
        &snapshot.collections,
        &plan.collections,
        EntityKind::Collection,
        &mut actions,
    );
    let items = merge_sequence(&snapshot.items, &plan.items, EntityKind::Item, &mut actions);

    let group_metadata = match &plan.library_group_metadata {
        Some(metadata) => {
            actions.push(AppliedAction::GroupMetadataUpdated {
                name: metadata.name.clone(),
                version: metadata.version,
            });
            Some(metadata.clone())
        }
        None => snapshot.group_metadata.clone(),
    };

    MergeOutcome {
        snapshot: LibrarySnapshot {
            group_metadata,
            versions: plan.next_versions,
            collections,
            items,
        },
        actions,
    }
}

/// Delete-then-append merge of one entity sequence
fn merge_sequence<T: Entity>(
    current: &[T],
    changes: &SyncActionSet<T>,
    kind: EntityKind,
    actions: &mut Vec<AppliedAction>,
) -> Vec<T> {
    let mut replica: IndexMap<EntityKey, T> = current
        .iter()
        .map(|entity| (entity.key().clone(), entity.clone()))
        .collect();

    for key in changes.deleted_keys() {
        if replica.contains_key(key) {
            actions.push(AppliedAction::Removed {
                kind,
                key: key.clone(),
            });
        }
    }

    let updated_keys: HashSet<&EntityKey> = changes.updated().map(Entity::key).collect();
    let upserts: Vec<AppliedAction> = changes
        .updated()
        .map(|entity| AppliedAction::Upserted {
            kind,
            key: entity.key().clone(),
            version: entity.version(),
            replaced: replica.contains_key(entity.key()),
        })
        .collect();

    replica.retain(|key, _| !changes.deleted_keys().contains(key) && !updated_keys.contains(key));

    for entity in changes.updated() {
        replica.insert(entity.key().clone(), entity.clone());
    }
    actions.extend(upserts);

    replica.into_values().collect()
}
