//! SQLite implementation of ILibraryStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! library store port defined in bibsync-core.
//!
//! ## Type Mapping
//!
//! | Domain Type        | SQL Type | Strategy                                     |
//! |--------------------|----------|----------------------------------------------|
//! | UserId             | INTEGER  | `as_u64()` checked into `i64`                |
//! | LibraryId          | TEXT     | `users/<id>` / `groups/<id>` via `Display` / `FromStr` |
//! | EntityKey          | TEXT     | String via `.as_str()` / `EntityKey::new()`  |
//! | version, cursors   | INTEGER  | `u64` checked into `i64`                     |
//! | GroupMetadata      | TEXT     | serde_json serialization                     |
//! | payload `data`     | TEXT     | serde_json serialization                     |
//! | DateTime<Utc>      | TEXT     | RFC 3339                                     |
//!
//! Entity order is stored in a `position` column so a snapshot reads back
//! in the order it was written.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use bibsync_core::domain::{
    Collection, Entity, EntityKey, GroupMetadata, Item, LibraryId, LibrarySnapshot, UserId,
    VersionCursor,
};
use bibsync_core::ports::{ILibraryStore, StoredLibrary};

use crate::StoreError;

/// SQLite-based implementation of the library store port
///
/// A snapshot write replaces the library's rows inside one transaction, so a
/// failed or dropped write leaves the previous snapshot in place.
#[derive(Debug, Clone)]
pub struct SqliteLibraryStore {
    pool: SqlitePool,
}

impl SqliteLibraryStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn to_sql_int(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| {
        StoreError::SerializationError(format!("{what} {value} exceeds the storable range"))
    })
}

fn from_sql_int(value: i64, what: &str) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::SerializationError(format!("negative {what} in store: {value}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_group_metadata(raw: Option<String>) -> Result<Option<GroupMetadata>, StoreError> {
    raw.map(|json| {
        serde_json::from_str(&json).map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse group metadata: {}", e))
        })
    })
    .transpose()
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn versions_from_row(row: &SqliteRow) -> Result<VersionCursor, StoreError> {
    Ok(VersionCursor::new(
        from_sql_int(row.try_get("collections_version")?, "collections_version")?,
        from_sql_int(row.try_get("items_version")?, "items_version")?,
        from_sql_int(row.try_get("deleted_version")?, "deleted_version")?,
    ))
}

/// Key, version and payload of an entity row
fn entity_parts_from_row(
    row: &SqliteRow,
) -> Result<(EntityKey, u64, serde_json::Value), StoreError> {
    let key: String = row.try_get("key")?;
    let version: i64 = row.try_get("version")?;
    let data: String = row.try_get("data")?;

    let key = EntityKey::new(key)
        .map_err(|e| StoreError::SerializationError(format!("Stored key is invalid: {}", e)))?;
    let data = serde_json::from_str(&data).map_err(|e| {
        StoreError::SerializationError(format!("Failed to parse payload of {}: {}", key, e))
    })?;

    Ok((key, from_sql_int(version, "version")?, data))
}

fn stored_library_from_row(row: &SqliteRow) -> Result<StoredLibrary, StoreError> {
    let library: String = row.try_get("library_id")?;
    let library: LibraryId = library
        .parse()
        .map_err(|e| StoreError::SerializationError(format!("Stored library id: {}", e)))?;
    let last_synced_at: Option<String> = row.try_get("last_synced_at")?;

    Ok(StoredLibrary {
        library,
        group_metadata: parse_group_metadata(row.try_get("group_metadata")?)?,
        versions: versions_from_row(row)?,
        collection_count: from_sql_int(row.try_get("collection_count")?, "collection_count")?,
        item_count: from_sql_int(row.try_get("item_count")?, "item_count")?,
        last_synced_at: last_synced_at.as_deref().map(parse_datetime).transpose()?,
    })
}

// ============================================================================
// Snapshot writes
// ============================================================================

/// Tables holding entity rows
#[derive(Debug, Clone, Copy)]
enum EntityTable {
    Collections,
    Items,
}

impl EntityTable {
    fn name(self) -> &'static str {
        match self {
            Self::Collections => "collections",
            Self::Items => "items",
        }
    }
}

async fn replace_entities<T: Entity + EntityData>(
    tx: &mut Transaction<'_, Sqlite>,
    table: EntityTable,
    user: i64,
    library: &str,
    entities: &[T],
) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND library_id = ?",
        table.name()
    ))
    .bind(user)
    .bind(library)
    .execute(&mut **tx)
    .await?;

    let insert = format!(
        "INSERT INTO {} (user_id, library_id, position, key, version, data) \
         VALUES (?, ?, ?, ?, ?, ?)",
        table.name()
    );
    for (position, entity) in entities.iter().enumerate() {
        let data = serde_json::to_string(entity.data()).map_err(|e| {
            StoreError::SerializationError(format!(
                "Failed to serialize payload of {}: {}",
                entity.key(),
                e
            ))
        })?;
        sqlx::query(&insert)
            .bind(user)
            .bind(library)
            .bind(to_sql_int(position as u64, "position")?)
            .bind(entity.key().as_str())
            .bind(to_sql_int(entity.version(), "version")?)
            .bind(data)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Access to the raw payload of an entity
trait EntityData {
    fn data(&self) -> &serde_json::Value;
}

impl EntityData for Collection {
    fn data(&self) -> &serde_json::Value {
        &self.data
    }
}

impl EntityData for Item {
    fn data(&self) -> &serde_json::Value {
        &self.data
    }
}

// ============================================================================
// ILibraryStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ILibraryStore for SqliteLibraryStore {
    async fn read_versions(
        &self,
        user: &UserId,
        library: &LibraryId,
    ) -> anyhow::Result<VersionCursor> {
        let row = sqlx::query(
            "SELECT collections_version, items_version, deleted_version \
             FROM libraries WHERE user_id = ? AND library_id = ?",
        )
        .bind(to_sql_int(user.as_u64(), "user id")?)
        .bind(library.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(versions_from_row(r)?),
            None => Ok(VersionCursor::zero()),
        }
    }

    async fn read_snapshot(
        &self,
        user: &UserId,
        library: &LibraryId,
    ) -> anyhow::Result<LibrarySnapshot> {
        let user_id = to_sql_int(user.as_u64(), "user id")?;
        let library_id = library.to_string();

        let row = sqlx::query(
            "SELECT group_metadata, collections_version, items_version, deleted_version \
             FROM libraries WHERE user_id = ? AND library_id = ?",
        )
        .bind(user_id)
        .bind(&library_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(LibrarySnapshot::empty());
        };

        let collections = sqlx::query(
            "SELECT key, version, data FROM collections \
             WHERE user_id = ? AND library_id = ? ORDER BY position ASC",
        )
        .bind(user_id)
        .bind(&library_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| entity_parts_from_row(r).map(|(k, v, d)| Collection::new(k, v, d)))
        .collect::<Result<Vec<_>, _>>()?;

        let items = sqlx::query(
            "SELECT key, version, data FROM items \
             WHERE user_id = ? AND library_id = ? ORDER BY position ASC",
        )
        .bind(user_id)
        .bind(&library_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| entity_parts_from_row(r).map(|(k, v, d)| Item::new(k, v, d)))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(LibrarySnapshot {
            group_metadata: parse_group_metadata(row.try_get("group_metadata")?)?,
            versions: versions_from_row(&row)?,
            collections,
            items,
        })
    }

    async fn write_snapshot(
        &self,
        user: &UserId,
        library: &LibraryId,
        snapshot: &LibrarySnapshot,
    ) -> anyhow::Result<()> {
        let user_id = to_sql_int(user.as_u64(), "user id")?;
        let library_id = library.to_string();
        let group_metadata = snapshot
            .group_metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Failed to serialize group metadata: {}", e))?;
        let versions = snapshot.versions;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO libraries \
                (user_id, library_id, group_metadata, collections_version, items_version, \
                 deleted_version, last_synced_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, library_id) DO UPDATE SET \
                group_metadata = excluded.group_metadata, \
                collections_version = excluded.collections_version, \
                items_version = excluded.items_version, \
                deleted_version = excluded.deleted_version, \
                last_synced_at = excluded.last_synced_at",
        )
        .bind(user_id)
        .bind(&library_id)
        .bind(group_metadata)
        .bind(to_sql_int(versions.collections, "collections_version")?)
        .bind(to_sql_int(versions.items, "items_version")?)
        .bind(to_sql_int(versions.deleted, "deleted_version")?)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        replace_entities(
            &mut tx,
            EntityTable::Collections,
            user_id,
            &library_id,
            &snapshot.collections,
        )
        .await?;
        replace_entities(&mut tx, EntityTable::Items, user_id, &library_id, &snapshot.items)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            library = %library,
            collections = snapshot.collections.len(),
            items = snapshot.items.len(),
            "Snapshot written"
        );
        Ok(())
    }

    async fn list_libraries(&self, user: &UserId) -> anyhow::Result<Vec<StoredLibrary>> {
        let rows = sqlx::query(
            "SELECT l.library_id, l.group_metadata, l.collections_version, l.items_version, \
                    l.deleted_version, l.last_synced_at, \
                    (SELECT COUNT(*) FROM collections c \
                       WHERE c.user_id = l.user_id AND c.library_id = l.library_id) \
                       AS collection_count, \
                    (SELECT COUNT(*) FROM items i \
                       WHERE i.user_id = l.user_id AND i.library_id = l.library_id) \
                       AS item_count \
             FROM libraries l WHERE l.user_id = ? ORDER BY l.library_id ASC",
        )
        .bind(to_sql_int(user.as_u64(), "user id")?)
        .fetch_all(&self.pool)
        .await?;

        let libraries = rows
            .iter()
            .map(stored_library_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(libraries)
    }
}
