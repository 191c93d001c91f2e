//! Remote entities
//!
//! Collections and items are identified by an opaque [`EntityKey`], carry a
//! remote `version`, and keep their payload as raw JSON so that fields the
//! engine does not interpret survive a round trip through the local store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::newtypes::EntityKey;

/// Common accessors for versioned, keyed remote entities
pub trait Entity: Clone {
    /// The entity's unique key
    fn key(&self) -> &EntityKey;

    /// The entity's remote version
    fn version(&self) -> u64;
}

/// A collection (folder-like grouping of items)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection key
    pub key: EntityKey,
    /// Remote version of this collection
    pub version: u64,
    /// Collection payload (`name`, `parentCollection`, ...)
    #[serde(default)]
    pub data: Value,
}

impl Collection {
    /// Creates a collection from its parts
    pub fn new(key: EntityKey, version: u64, data: Value) -> Self {
        Self { key, version, data }
    }

    /// Collection name, if present in the payload
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.data.get("name").and_then(Value::as_str)
    }

    /// Parent collection key; the remote uses `false` for top-level collections
    #[must_use]
    pub fn parent_key(&self) -> Option<&str> {
        self.data.get("parentCollection").and_then(Value::as_str)
    }
}

impl Entity for Collection {
    fn key(&self) -> &EntityKey {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// A bibliographic item (book, article, attachment, note, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item key
    pub key: EntityKey,
    /// Remote version of this item
    pub version: u64,
    /// Item payload (`itemType`, `title`, `creators`, `deleted`, ...)
    #[serde(default)]
    pub data: Value,
}

impl Item {
    /// Creates an item from its parts
    pub fn new(key: EntityKey, version: u64, data: Value) -> Self {
        Self { key, version, data }
    }

    /// Item title, if present in the payload
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(Value::as_str)
    }

    /// Self-deletion flag carried by the payload
    ///
    /// The remote marks trashed items with `deleted: 1` (older payloads use
    /// `true`). Any non-zero number or `true` counts as deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        match self.data.get("deleted") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            _ => false,
        }
    }
}

impl Entity for Item {
    fn key(&self) -> &EntityKey {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}
