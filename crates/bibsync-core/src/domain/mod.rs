//! Domain entities and business logic
//!
//! This module contains the core domain types for bibsync:
//! - Newtypes for library identifiers and entity keys
//! - The `Library` sum type and group metadata
//! - Version cursors for the three remote change streams
//! - Remote entities (`Collection`, `Item`)
//! - Sync plans (`SyncActionSet`, `LibrarySyncPlan`)
//! - Materialized local snapshots
//! - Domain-specific error types

pub mod entity;
pub mod errors;
pub mod library;
pub mod newtypes;
pub mod plan;
pub mod snapshot;
pub mod versions;

// Re-export commonly used types
pub use entity::{Collection, Entity, Item};
pub use errors::{DomainError, LibrarySyncError, QueryStage};
pub use library::{Group, GroupMetadata, Library, UserIdentity};
pub use newtypes::*;
pub use plan::{has_changes, LibrarySyncPlan, SyncActionSet};
pub use snapshot::LibrarySnapshot;
pub use versions::VersionCursor;
