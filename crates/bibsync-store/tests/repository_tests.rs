//! Integration tests for SqliteLibraryStore
//!
//! These tests verify all ILibraryStore methods using an in-memory
//! SQLite database. Each test function creates a fresh database to
//! ensure test isolation.

use serde_json::json;

use bibsync_core::domain::{
    Collection, EntityKey, GroupId, GroupMetadata, Item, LibraryId, LibrarySnapshot, UserId,
    VersionCursor,
};
use bibsync_core::ports::ILibraryStore;
use bibsync_store::{DatabasePool, SqliteLibraryStore};

// ============================================================================
// Test helpers
// ============================================================================

/// Create a fresh in-memory store for each test
async fn setup() -> SqliteLibraryStore {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteLibraryStore::new(pool.pool().clone())
}

fn key(s: &str) -> EntityKey {
    EntityKey::new(s.to_string()).unwrap()
}

const USER: UserId = UserId::new(42);

fn personal() -> LibraryId {
    LibraryId::User(USER)
}

fn sample_snapshot() -> LibrarySnapshot {
    LibrarySnapshot {
        group_metadata: None,
        versions: VersionCursor::new(10, 12, 9),
        collections: vec![
            Collection::new(key("C2"), 4, json!({"name": "Second", "parentCollection": false})),
            Collection::new(key("C1"), 3, json!({"name": "First", "parentCollection": "C2"})),
        ],
        items: vec![
            Item::new(key("I3"), 12, json!({"title": "Gamma", "creators": []})),
            Item::new(key("I1"), 5, json!({"title": "Alpha", "tags": [{"tag": "x"}]})),
            Item::new(key("I2"), 7, json!({"title": "Beta"})),
        ],
    }
}

// ============================================================================
// Reads before first sync
// ============================================================================

#[tokio::test]
async fn test_unknown_library_reads_zero_cursor() {
    let store = setup().await;
    let versions = store.read_versions(&USER, &personal()).await.unwrap();
    assert!(versions.is_zero());
}

#[tokio::test]
async fn test_unknown_library_reads_empty_snapshot() {
    let store = setup().await;
    let snapshot = store.read_snapshot(&USER, &personal()).await.unwrap();
    assert_eq!(snapshot, LibrarySnapshot::empty());
}

// ============================================================================
// Write / read round trip
// ============================================================================

#[tokio::test]
async fn test_write_then_read_preserves_order_and_payload() {
    let store = setup().await;
    let snapshot = sample_snapshot();

    store
        .write_snapshot(&USER, &personal(), &snapshot)
        .await
        .unwrap();

    let loaded = store.read_snapshot(&USER, &personal()).await.unwrap();
    assert_eq!(loaded, snapshot);

    let versions = store.read_versions(&USER, &personal()).await.unwrap();
    assert_eq!(versions, VersionCursor::new(10, 12, 9));
}

#[tokio::test]
async fn test_write_replaces_previous_snapshot() {
    let store = setup().await;
    store
        .write_snapshot(&USER, &personal(), &sample_snapshot())
        .await
        .unwrap();

    let next = LibrarySnapshot {
        group_metadata: None,
        versions: VersionCursor::new(11, 13, 10),
        collections: vec![],
        items: vec![Item::new(key("I9"), 13, json!({"title": "Only"}))],
    };
    store.write_snapshot(&USER, &personal(), &next).await.unwrap();

    let loaded = store.read_snapshot(&USER, &personal()).await.unwrap();
    assert_eq!(loaded, next);
}

#[tokio::test]
async fn test_group_metadata_round_trip() {
    let store = setup().await;
    let library = LibraryId::Group(GroupId::new(7));
    let mut metadata = GroupMetadata::new("Lab Papers", 3);
    metadata.owner = Some(USER);
    metadata.description = Some("Shared reading".to_string());

    let snapshot = LibrarySnapshot {
        group_metadata: Some(metadata.clone()),
        ..LibrarySnapshot::default()
    };
    store.write_snapshot(&USER, &library, &snapshot).await.unwrap();

    let loaded = store.read_snapshot(&USER, &library).await.unwrap();
    assert_eq!(loaded.group_metadata, Some(metadata));
}

// ============================================================================
// Isolation
// ============================================================================

#[tokio::test]
async fn test_libraries_are_isolated() {
    let store = setup().await;
    let group = LibraryId::Group(GroupId::new(1));

    store
        .write_snapshot(&USER, &personal(), &sample_snapshot())
        .await
        .unwrap();

    let other = store.read_snapshot(&USER, &group).await.unwrap();
    assert!(other.is_empty());
    assert!(store.read_versions(&USER, &group).await.unwrap().is_zero());
}

#[tokio::test]
async fn test_users_are_isolated() {
    let store = setup().await;
    let other_user = UserId::new(43);

    store
        .write_snapshot(&USER, &personal(), &sample_snapshot())
        .await
        .unwrap();

    let snapshot = store.read_snapshot(&other_user, &personal()).await.unwrap();
    assert!(snapshot.is_empty());
    assert!(store.list_libraries(&other_user).await.unwrap().is_empty());
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_libraries_with_counts() {
    let store = setup().await;
    let group = LibraryId::Group(GroupId::new(5));

    store
        .write_snapshot(&USER, &personal(), &sample_snapshot())
        .await
        .unwrap();
    store
        .write_snapshot(
            &USER,
            &group,
            &LibrarySnapshot {
                group_metadata: Some(GroupMetadata::new("Shared", 1)),
                versions: VersionCursor::new(1, 1, 1),
                collections: vec![],
                items: vec![Item::new(key("G1"), 1, json!({}))],
            },
        )
        .await
        .unwrap();

    let libraries = store.list_libraries(&USER).await.unwrap();
    assert_eq!(libraries.len(), 2);

    // Ordered by library id: "groups/5" < "users/42"
    assert_eq!(libraries[0].library, group);
    assert_eq!(libraries[0].item_count, 1);
    assert_eq!(libraries[0].group_metadata.as_ref().unwrap().name, "Shared");

    assert_eq!(libraries[1].library, personal());
    assert_eq!(libraries[1].collection_count, 2);
    assert_eq!(libraries[1].item_count, 3);
    assert_eq!(libraries[1].versions, VersionCursor::new(10, 12, 9));
    assert!(libraries[1].last_synced_at.is_some());
}

// ============================================================================
// File-backed database
// ============================================================================

#[tokio::test]
async fn test_file_database_persists_across_pools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("library.db");

    {
        let pool = DatabasePool::new(&path).await.unwrap();
        let store = SqliteLibraryStore::new(pool.pool().clone());
        store
            .write_snapshot(&USER, &personal(), &sample_snapshot())
            .await
            .unwrap();
        pool.pool().close().await;
    }

    let pool = DatabasePool::new(&path).await.unwrap();
    let store = SqliteLibraryStore::new(pool.pool().clone());
    let loaded = store.read_snapshot(&USER, &personal()).await.unwrap();
    assert_eq!(loaded, sample_snapshot());
}
