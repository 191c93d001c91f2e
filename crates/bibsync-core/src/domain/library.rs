//! Library scopes
//!
//! A [`Library`] identifies one synchronization scope: the user's personal
//! library or one group's shared library. All version cursors and snapshots
//! are scoped to exactly one library.

use serde::{Deserialize, Serialize};

use super::newtypes::{GroupId, LibraryId, UserId};

/// The authenticated user whose libraries are synchronized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Remote user ID
    pub id: UserId,
    /// Remote username, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl UserIdentity {
    /// Creates an identity with no username
    pub fn new(id: UserId) -> Self {
        Self { id, username: None }
    }

    /// Sets the username
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Descriptive metadata of a group, as reported by the remote
///
/// `version` is the group's own metadata version and is unrelated to the
/// library's content cursors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    /// Group display name
    pub name: String,
    /// Metadata version
    #[serde(default)]
    pub version: u64,
    /// Owner user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupMetadata {
    /// Creates metadata with only a name
    pub fn new(name: impl Into<String>, version: u64) -> Self {
        Self {
            name: name.into(),
            version,
            owner: None,
            description: None,
        }
    }
}

/// A group membership of the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Remote group ID
    pub id: GroupId,
    /// Group metadata
    pub metadata: GroupMetadata,
}

/// A synchronization scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Library {
    /// The user's own library
    Personal {
        /// The owning user
        owner_id: UserId,
    },
    /// A group library the user is a member of
    Group {
        /// The group
        group_id: GroupId,
        /// Group metadata at enumeration time
        group_metadata: GroupMetadata,
    },
}

impl Library {
    /// Stable identity used for cursors, snapshots and remote paths
    #[must_use]
    pub fn id(&self) -> LibraryId {
        match self {
            Self::Personal { owner_id } => LibraryId::User(*owner_id),
            Self::Group { group_id, .. } => LibraryId::Group(*group_id),
        }
    }

    /// Group metadata, for group libraries
    #[must_use]
    pub fn group_metadata(&self) -> Option<&GroupMetadata> {
        match self {
            Self::Personal { .. } => None,
            Self::Group { group_metadata, .. } => Some(group_metadata),
        }
    }

    /// Human-readable name for status output
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Personal { .. } => "My Library".to_string(),
            Self::Group { group_metadata, .. } => group_metadata.name.clone(),
        }
    }
}

impl From<&Group> for Library {
    fn from(group: &Group) -> Self {
        Self::Group {
            group_id: group.id,
            group_metadata: group.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_library_id() {
        let library = Library::Personal {
            owner_id: UserId::new(10),
        };
        assert_eq!(library.id(), LibraryId::User(UserId::new(10)));
        assert!(library.group_metadata().is_none());
        assert_eq!(library.display_name(), "My Library");
    }

    #[test]
    fn test_group_library_from_group() {
        let group = Group {
            id: GroupId::new(99),
            metadata: GroupMetadata::new("Lab Papers", 4),
        };
        let library = Library::from(&group);

        assert_eq!(library.id(), LibraryId::Group(GroupId::new(99)));
        assert_eq!(library.group_metadata().unwrap().name, "Lab Papers");
        assert_eq!(library.display_name(), "Lab Papers");
    }

    #[test]
    fn test_library_serde_is_tagged() {
        let library = Library::Personal {
            owner_id: UserId::new(1),
        };
        let json = serde_json::to_value(&library).unwrap();
        assert_eq!(json["kind"], "personal");
        assert_eq!(json["owner_id"], 1);
    }
}
