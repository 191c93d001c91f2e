//! Multi-library synchronization engine
//!
//! The [`SyncEngine`] drives one sync run over every library of a user:
//!
//! 1. **Enumerate**: personal library first, then one per group
//! 2. **Read**: last-applied cursors and the materialized snapshot
//! 3. **Plan**: query the remote for deletions and changed entities
//! 4. **Merge**: apply the plan to the snapshot
//! 5. **Persist**: write the merged snapshot when anything changed
//!
//! Failures are scoped to one library. A failed library keeps its stored
//! cursors and snapshot, is recorded in the [`SyncReport`], and the run moves
//! on to the next library.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bibsync_core::config::SyncConfig;
use bibsync_core::domain::{
    has_changes, Group, Library, LibraryId, LibrarySnapshot, LibrarySyncError, QueryStage,
    UserId, UserIdentity, VersionCursor,
};
use bibsync_core::ports::{ILibraryStore, IRemoteLibrary};
use bibsync_core::usecases::{
    enumerate_libraries, merge_snapshot, AppliedAction, EntityKind, PlanDeltaUseCase,
};

/// Options for a single sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOptions {
    /// Plan from the zero cursor against an empty snapshot
    pub full_resync: bool,
    /// Plan and merge without writing anything
    pub dry_run: bool,
}

/// Per-entity-type change counts of one library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    /// Entities removed from the snapshot
    pub removed: usize,
    /// Entities that were not in the snapshot before
    pub inserted: usize,
    /// Entities replaced by a newer version
    pub replaced: usize,
}

impl ChangeCounts {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.removed + self.inserted + self.replaced
    }
}

/// Result of a successfully synchronized library
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibrarySummary {
    /// Cursors before the run
    pub previous_versions: VersionCursor,
    /// Cursors after the run
    pub next_versions: VersionCursor,
    /// Collection changes
    pub collections: ChangeCounts,
    /// Item changes
    pub items: ChangeCounts,
    /// Whether group metadata was replaced
    pub group_metadata_updated: bool,
    /// Whether the merged snapshot was persisted
    pub written: bool,
}

/// Status of one library within a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LibraryStatus {
    /// Planned and merged (and persisted unless nothing changed or dry run)
    Synced(LibrarySummary),
    /// Aborted; stored state left untouched
    Failed {
        /// Error kind (`remote_query_failed`, `local_read_failed`, ...)
        kind: &'static str,
        /// Failing remote query, for remote failures
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<QueryStage>,
        /// Full error message
        message: String,
    },
}

/// Outcome of one library within a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryOutcome {
    /// Library identity
    pub library: LibraryId,
    /// Display name
    pub name: String,
    /// What happened
    #[serde(flatten)]
    pub status: LibraryStatus,
}

impl LibraryOutcome {
    /// Returns true if the library failed
    pub fn is_failed(&self) -> bool {
        matches!(self.status, LibraryStatus::Failed { .. })
    }

    /// Summary of a synced library
    pub fn summary(&self) -> Option<&LibrarySummary> {
        match &self.status {
            LibraryStatus::Synced(summary) => Some(summary),
            LibraryStatus::Failed { .. } => None,
        }
    }
}

/// Summary of a complete sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// Whether the run was a dry run
    pub dry_run: bool,
    /// Outcomes in enumeration order
    pub libraries: Vec<LibraryOutcome>,
}

impl SyncReport {
    /// Libraries that failed
    pub fn failures(&self) -> impl Iterator<Item = &LibraryOutcome> {
        self.libraries.iter().filter(|l| l.is_failed())
    }

    /// Returns true if at least one library failed
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Number of libraries whose snapshot was written
    pub fn written_count(&self) -> usize {
        self.libraries
            .iter()
            .filter_map(LibraryOutcome::summary)
            .filter(|s| s.written)
            .count()
    }
}

/// Drives sync runs across all libraries of a user
pub struct SyncEngine {
    planner: PlanDeltaUseCase,
    store: Arc<dyn ILibraryStore + Send + Sync>,
    /// Libraries processed concurrently (1 = strictly sequential)
    max_concurrent: usize,
}

impl SyncEngine {
    /// Creates a new `SyncEngine`
    ///
    /// # Arguments
    /// * `remote` - Remote library queries (IRemoteLibrary)
    /// * `store` - Cursor and snapshot persistence (ILibraryStore)
    /// * `config` - Sync settings (`max_concurrent_libraries`)
    pub fn new(
        remote: Arc<dyn IRemoteLibrary + Send + Sync>,
        store: Arc<dyn ILibraryStore + Send + Sync>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            planner: PlanDeltaUseCase::new(remote),
            store,
            max_concurrent: config.max_concurrent_libraries.max(1),
        }
    }

    /// Synchronizes the personal library of `user` and every group library
    ///
    /// Libraries are processed in enumeration order. With
    /// `max_concurrent_libraries > 1` up to that many run at once; each
    /// library is still handled by exactly one task, so writes for the same
    /// library never interleave. The report lists outcomes in enumeration
    /// order regardless of completion order.
    #[tracing::instrument(skip(self, user, groups), fields(user = %user.id, groups = groups.len()))]
    pub async fn sync_all(
        &self,
        user: &UserIdentity,
        groups: &[Group],
        options: SyncOptions,
    ) -> SyncReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let libraries = enumerate_libraries(user, groups);

        info!(
            %run_id,
            libraries = libraries.len(),
            full_resync = options.full_resync,
            dry_run = options.dry_run,
            "Starting sync run"
        );

        let outcomes: Vec<LibraryOutcome> = stream::iter(libraries.iter())
            .map(|library| self.run_library(&user.id, library, options))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let report = SyncReport {
            run_id,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            dry_run: options.dry_run,
            libraries: outcomes,
        };

        info!(
            %run_id,
            written = report.written_count(),
            failed = report.failures().count(),
            duration_ms = report.duration_ms,
            "Sync run finished"
        );

        report
    }

    async fn run_library(
        &self,
        user: &UserId,
        library: &Library,
        options: SyncOptions,
    ) -> LibraryOutcome {
        let status = match self.sync_library(user, library, options).await {
            Ok(summary) => {
                info!(
                    library = %library.id(),
                    collections = summary.collections.total(),
                    items = summary.items.total(),
                    written = summary.written,
                    "Library synced"
                );
                LibraryStatus::Synced(summary)
            }
            Err(err) => {
                warn!(
                    library = %err.library(),
                    kind = err.kind(),
                    stage = err.stage().map(|s| s.as_str()),
                    error = %err,
                    "Library sync failed"
                );
                LibraryStatus::Failed {
                    kind: err.kind(),
                    stage: err.stage(),
                    message: err.to_string(),
                }
            }
        };

        LibraryOutcome {
            library: library.id(),
            name: library.display_name(),
            status,
        }
    }

    /// Reads, plans, merges and persists one library
    #[tracing::instrument(skip(self, user, library), fields(library = %library.id()))]
    async fn sync_library(
        &self,
        user: &UserId,
        library: &Library,
        options: SyncOptions,
    ) -> Result<LibrarySummary, LibrarySyncError> {
        let id = library.id();

        // A full resync is an explicit reset: stored state is not consulted
        let (previous, snapshot) = if options.full_resync {
            (VersionCursor::zero(), LibrarySnapshot::empty())
        } else {
            let versions = self.store.read_versions(user, &id).await.map_err(|source| {
                LibrarySyncError::LocalReadFailed {
                    library: id,
                    what: "versions",
                    source,
                }
            })?;
            let snapshot = self.store.read_snapshot(user, &id).await.map_err(|source| {
                LibrarySyncError::LocalReadFailed {
                    library: id,
                    what: "snapshot",
                    source,
                }
            })?;
            (versions, snapshot)
        };

        let group_metadata = library
            .group_metadata()
            .filter(|metadata| snapshot.group_metadata.as_ref() != Some(*metadata))
            .cloned();

        let plan = self.planner.execute(library, &previous, group_metadata).await?;
        debug_assert!(
            plan.next_versions.dominates(&previous),
            "cursor moved backwards: {:?} -> {:?}",
            previous,
            plan.next_versions
        );
        let changed = has_changes(&plan);
        let advanced = plan.next_versions != previous;

        let outcome = merge_snapshot(&snapshot, &plan);
        for action in &outcome.actions {
            debug!(action = ?action, "Merge action");
        }

        let (collections, items, group_metadata_updated) = tally(&outcome.actions);

        // A reset must overwrite whatever was stored, even with nothing to apply
        let should_write = options.full_resync || changed || advanced;
        let written = should_write && !options.dry_run;
        if written {
            self.store
                .write_snapshot(user, &id, &outcome.snapshot)
                .await
                .map_err(|source| LibrarySyncError::LocalWriteFailed {
                    library: id,
                    source,
                })?;
        } else {
            debug!(changed, advanced, dry_run = options.dry_run, "Skipping snapshot write");
        }

        Ok(LibrarySummary {
            previous_versions: previous,
            next_versions: plan.next_versions,
            collections,
            items,
            group_metadata_updated,
            written,
        })
    }
}

/// Counts merge actions per entity kind
fn tally(actions: &[AppliedAction]) -> (ChangeCounts, ChangeCounts, bool) {
    let mut collections = ChangeCounts::default();
    let mut items = ChangeCounts::default();
    let mut group_metadata_updated = false;

    for action in actions {
        match action {
            AppliedAction::Removed { kind, .. } => {
                counts_for(*kind, &mut collections, &mut items).removed += 1;
            }
            AppliedAction::Upserted { kind, replaced, .. } => {
                let counts = counts_for(*kind, &mut collections, &mut items);
                if *replaced {
                    counts.replaced += 1;
                } else {
                    counts.inserted += 1;
                }
            }
            AppliedAction::GroupMetadataUpdated { .. } => group_metadata_updated = true,
        }
    }

    (collections, items, group_metadata_updated)
}

fn counts_for<'a>(
    kind: EntityKind,
    collections: &'a mut ChangeCounts,
    items: &'a mut ChangeCounts,
) -> &'a mut ChangeCounts {
    match kind {
        EntityKind::Collection => collections,
        EntityKind::Item => items,
    }
}
