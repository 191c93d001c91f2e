//! Version cursors
//!
//! Each library tracks three independent change streams. A cursor value is
//! the last remote version fully applied for that stream.

use serde::{Deserialize, Serialize};

/// Last-applied versions of a library's three change streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionCursor {
    /// Collection change stream
    pub collections: u64,
    /// Item change stream
    pub items: u64,
    /// Deletion feed
    pub deleted: u64,
}

impl VersionCursor {
    /// Creates a cursor from explicit values
    pub const fn new(collections: u64, items: u64, deleted: u64) -> Self {
        Self {
            collections,
            items,
            deleted,
        }
    }

    /// The zero cursor used for a first sync or a full resync
    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Returns true if no stream has ever been applied
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Returns true if every stream of `self` is at or past `other`
    pub fn dominates(&self, other: &Self) -> bool {
        self.collections >= other.collections
            && self.items >= other.items
            && self.deleted >= other.deleted
    }
}

/// Version fallback rule
///
/// The next cursor value for one stream, given the previous value and the
/// version the remote reported (if any).
///
/// - An absent version keeps the previous value. `Some(0)` is a real version
///   and is not treated as absent.
/// - A reported version lower than `previous` keeps `previous`, so cursors
///   never move backwards outside an explicit reset.
#[must_use]
pub fn next_version(previous: u64, reported: Option<u64>) -> u64 {
    match reported {
        Some(version) => version.max(previous),
        None => previous,
    }
}
