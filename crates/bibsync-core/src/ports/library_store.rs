//! Library store port (driven/secondary port)
//!
//! This module defines the interface for persisting the materialized
//! snapshot and version cursors of each library.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - Reading an unknown library is not an error: it yields the zero cursor
//!   and the empty snapshot, which is the state before a first sync.
//! - `write_snapshot` replaces the library's stored state as a whole. It must
//!   be atomic: a failed or cancelled write leaves the previous state intact.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{GroupMetadata, LibraryId, LibrarySnapshot, UserId, VersionCursor};

/// Summary of a stored library, for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredLibrary {
    /// Library identity
    pub library: LibraryId,
    /// Stored group metadata, for group libraries
    pub group_metadata: Option<GroupMetadata>,
    /// Stored cursors
    pub versions: VersionCursor,
    /// Number of stored collections
    pub collection_count: u64,
    /// Number of stored items
    pub item_count: u64,
    /// When the snapshot was last written
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Port trait for persistent library state
#[async_trait::async_trait]
pub trait ILibraryStore: Send + Sync {
    /// Last-applied cursors of a library (zero if never synced)
    async fn read_versions(
        &self,
        user: &UserId,
        library: &LibraryId,
    ) -> anyhow::Result<VersionCursor>;

    /// Materialized snapshot of a library (empty if never synced)
    async fn read_snapshot(
        &self,
        user: &UserId,
        library: &LibraryId,
    ) -> anyhow::Result<LibrarySnapshot>;

    /// Replaces the stored snapshot and cursors of a library
    async fn write_snapshot(
        &self,
        user: &UserId,
        library: &LibraryId,
        snapshot: &LibrarySnapshot,
    ) -> anyhow::Result<()>;

    /// All libraries stored for a user, ordered by library id
    async fn list_libraries(&self, user: &UserId) -> anyhow::Result<Vec<StoredLibrary>>;
}
