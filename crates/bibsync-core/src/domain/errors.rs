//! Domain error types
//!
//! This module defines error types specific to domain operations
//! (validation of identifiers and keys) and the library-scoped failures
//! surfaced by a synchronization cycle.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::newtypes::LibraryId;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid entity key format
    #[error("Invalid entity key: {0}")]
    InvalidKey(String),

    /// Invalid library identifier (expected `users/<id>` or `groups/<id>`)
    #[error("Invalid library id: {0}")]
    InvalidLibraryId(String),

    /// Numeric ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// The remote query a planning failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    /// Deletion feed since the `deleted` cursor
    Deletions,
    /// Changed collection keys since the `collections` cursor
    CollectionVersions,
    /// Full collection payloads for changed keys
    Collections,
    /// Changed item keys since the `items` cursor
    ItemVersions,
    /// Full item payloads for changed keys
    Items,
}

impl QueryStage {
    /// Stable name used in logs and JSON output
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deletions => "deletions",
            Self::CollectionVersions => "collection_versions",
            Self::Collections => "collections",
            Self::ItemVersions => "item_versions",
            Self::Items => "items",
        }
    }
}

impl Display for QueryStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure that aborts synchronization of one library
///
/// These errors are library-scoped: the failing library keeps its previous
/// cursors and snapshot, and a multi-library run continues with the next one.
#[derive(Debug, Error)]
pub enum LibrarySyncError {
    /// One of the remote queries failed (network, auth, decoding)
    #[error("Remote query '{stage}' failed for {library}: {source:#}")]
    RemoteQueryFailed {
        /// The library being planned
        library: LibraryId,
        /// Which query failed
        stage: QueryStage,
        /// Adapter error
        #[source]
        source: anyhow::Error,
    },

    /// The local store could not supply a version cursor or snapshot
    #[error("Failed to read local {what} for {library}: {source:#}")]
    LocalReadFailed {
        /// The library being read
        library: LibraryId,
        /// What was being read (`versions` or `snapshot`)
        what: &'static str,
        /// Adapter error
        #[source]
        source: anyhow::Error,
    },

    /// The merged snapshot could not be persisted
    #[error("Failed to write snapshot for {library}: {source:#}")]
    LocalWriteFailed {
        /// The library being written
        library: LibraryId,
        /// Adapter error
        #[source]
        source: anyhow::Error,
    },
}

impl LibrarySyncError {
    /// The library this failure is scoped to
    #[must_use]
    pub fn library(&self) -> LibraryId {
        match self {
            Self::RemoteQueryFailed { library, .. }
            | Self::LocalReadFailed { library, .. }
            | Self::LocalWriteFailed { library, .. } => *library,
        }
    }

    /// The failing remote query, for remote failures
    #[must_use]
    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            Self::RemoteQueryFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Short machine-readable error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RemoteQueryFailed { .. } => "remote_query_failed",
            Self::LocalReadFailed { .. } => "local_read_failed",
            Self::LocalWriteFailed { .. } => "local_write_failed",
        }
    }
}
