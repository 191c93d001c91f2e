//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for library identifiers and
//! entity keys. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Numeric account identifiers
// ============================================================================

/// Identifier of a remote user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Create a UserId from its numeric value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the numeric value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid UserId '{s}': {e}")))
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a remote group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u64);

impl GroupId {
    /// Create a GroupId from its numeric value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the numeric value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid GroupId '{s}': {e}")))
    }
}

impl From<u64> for GroupId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// LibraryId - persistence key for a synchronization scope
// ============================================================================

/// Stable identity of a library, independent of group metadata
///
/// Rendered as `users/<id>` or `groups/<id>`, which is also the URL prefix
/// used by the remote API and the key used by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LibraryId {
    /// A user's personal library
    User(UserId),
    /// A group's shared library
    Group(GroupId),
}

impl LibraryId {
    /// URL path prefix for this library (e.g. `/users/42`)
    #[must_use]
    pub fn path_prefix(&self) -> String {
        format!("/{self}")
    }

    /// Returns true for group libraries
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl Display for LibraryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "users/{id}"),
            Self::Group(id) => write!(f, "groups/{id}"),
        }
    }
}

impl FromStr for LibraryId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('/')
            .ok_or_else(|| DomainError::InvalidLibraryId(s.to_string()))?;

        match kind {
            "users" => id
                .parse()
                .map(Self::User)
                .map_err(|_| DomainError::InvalidLibraryId(s.to_string())),
            "groups" => id
                .parse()
                .map(Self::Group)
                .map_err(|_| DomainError::InvalidLibraryId(s.to_string())),
            _ => Err(DomainError::InvalidLibraryId(s.to_string())),
        }
    }
}

impl TryFrom<String> for LibraryId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LibraryId> for String {
    fn from(id: LibraryId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// EntityKey - opaque key of a collection or item
// ============================================================================

/// Opaque unique key of a remote collection or item
///
/// Keys are assigned by the remote and are usually short alphanumeric strings,
/// but any other characters are carried through unchanged. They are compared
/// byte-for-byte; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityKey(String);

impl EntityKey {
    /// Create a new EntityKey
    ///
    /// # Errors
    /// Returns error if the key is empty or contains whitespace, control
    /// characters or a comma (the separator of fetch-by-key requests)
    pub fn new(key: String) -> Result<Self, DomainError> {
        if key.is_empty() {
            return Err(DomainError::InvalidKey(
                "Entity key cannot be empty".to_string(),
            ));
        }

        if key
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == ',')
        {
            return Err(DomainError::InvalidKey(format!(
                "Entity key contains invalid characters: {key}"
            )));
        }

        Ok(Self(key))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for EntityKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityKey> for String {
    fn from(key: EntityKey) -> Self {
        key.0
    }
}

impl std::borrow::Borrow<str> for EntityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Tests
// ============================================================================
