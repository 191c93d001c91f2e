//! Integration tests for the deletion feed and changed-key queries

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use bibsync_remote::delta::{self, ObjectStream};

use crate::common;

#[tokio::test]
async fn test_deletions_returns_keys_and_version() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .and(query_param("since", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified-Version", "120")
                .set_body_json(json!({
                    "collections": ["COLL0001"],
                    "items": ["ITEM0001", "ITEM0002"],
                    "searches": [],
                    "tags": ["obsolete"],
                    "settings": []
                })),
        )
        .mount(&server)
        .await;

    let response = delta::get_deletions(&client, &common::user_library(), 100)
        .await
        .expect("deletions query failed")
        .expect("expected a response");

    assert_eq!(response.version, Some(120));
    assert_eq!(response.data.collections, vec![common::key("COLL0001")]);
    assert_eq!(
        response.data.items,
        vec![common::key("ITEM0001"), common::key("ITEM0002")]
    );
}

#[tokio::test]
async fn test_deletions_not_modified_is_none() {
    let (server, client) = common::setup_zotero_mock().await;
    common::mount_not_modified(&server, "/groups/77/deleted").await;

    let response = delta::get_deletions(&client, &common::group_library(77), 5)
        .await
        .expect("deletions query failed");

    assert!(response.is_none());
}

#[tokio::test]
async fn test_versions_preserve_response_order() {
    let (server, client) = common::setup_zotero_mock().await;
    common::mount_versions(
        &server,
        "/users/475425/items",
        40,
        Some(57),
        json!({"ZZZZ0001": 57, "AAAA0002": 41, "MMMM0003": 50}),
    )
    .await;

    let response = delta::get_versions(&client, &common::user_library(), ObjectStream::Items, 40)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.version, Some(57));
    let keys: Vec<&str> = response.data.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["ZZZZ0001", "AAAA0002", "MMMM0003"]);
    assert_eq!(response.data.get("AAAA0002"), Some(&41));
}

#[tokio::test]
async fn test_versions_accept_non_alphanumeric_keys() {
    let (server, client) = common::setup_zotero_mock().await;
    common::mount_versions(
        &server,
        "/users/475425/items",
        0,
        Some(9),
        json!({"ITEM0001": 9, "item-2_x": 9}),
    )
    .await;

    let response = delta::get_versions(&client, &common::user_library(), ObjectStream::Items, 0)
        .await
        .expect("keys with punctuation must not fail the stream")
        .unwrap();

    let keys: Vec<&str> = response.data.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["ITEM0001", "item-2_x"]);
}

#[tokio::test]
async fn test_item_versions_include_trashed() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/items"))
        .and(query_param("includeTrashed", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let response = delta::get_versions(&client, &common::user_library(), ObjectStream::Items, 0)
        .await
        .unwrap()
        .unwrap();
    assert!(response.data.is_empty());
}

#[tokio::test]
async fn test_versions_without_header_have_no_version() {
    let (server, client) = common::setup_zotero_mock().await;
    common::mount_versions(
        &server,
        "/users/475425/collections",
        3,
        None,
        json!({"COLL0009": 4}),
    )
    .await;

    let response = delta::get_versions(
        &client,
        &common::user_library(),
        ObjectStream::Collections,
        3,
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(response.version, None);
    assert_eq!(response.keys(), vec![common::key("COLL0009")]);
}

#[tokio::test]
async fn test_versions_not_modified_is_none() {
    let (server, client) = common::setup_zotero_mock().await;
    common::mount_not_modified(&server, "/users/475425/collections").await;

    let response = delta::get_versions(
        &client,
        &common::user_library(),
        ObjectStream::Collections,
        9,
    )
    .await
    .unwrap();

    assert!(response.is_none());
}

#[tokio::test]
async fn test_versions_malformed_body_is_error() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2, 3]"))
        .mount(&server)
        .await;

    let result = delta::get_versions(&client, &common::user_library(), ObjectStream::Items, 0).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_forbidden_library_is_error() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/groups/9/deleted"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = delta::get_deletions(&client, &common::group_library(9), 0)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Forbidden"));
}
