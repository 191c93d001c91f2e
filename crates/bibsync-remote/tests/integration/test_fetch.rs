//! Integration tests for fetch-by-keys

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use bibsync_remote::fetch;

use crate::common;

#[tokio::test]
async fn test_fetch_items_reorders_to_request_order() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/items"))
        .and(query_param("itemKey", "ITEM0003,ITEM0001,ITEM0002"))
        .and(query_param("includeTrashed", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::item_json("ITEM0001", 10, "First", false),
            common::item_json("ITEM0002", 11, "Second", true),
            common::item_json("ITEM0003", 12, "Third", false),
        ])))
        .mount(&server)
        .await;

    let keys = vec![
        common::key("ITEM0003"),
        common::key("ITEM0001"),
        common::key("ITEM0002"),
    ];
    let items = fetch::fetch_items(&client, &common::user_library(), &keys, 50)
        .await
        .expect("fetch failed");

    let got: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(got, vec!["ITEM0003", "ITEM0001", "ITEM0002"]);
    assert_eq!(items[0].title(), Some("Third"));
    assert!(items[2].is_deleted());
    assert!(!items[1].is_deleted());
}

#[tokio::test]
async fn test_fetch_collections_in_chunks() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/collections"))
        .and(query_param("collectionKey", "COLL0001,COLL0002"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::collection_json("COLL0002", 4, "B"),
            common::collection_json("COLL0001", 3, "A"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/475425/collections"))
        .and(query_param("collectionKey", "COLL0003"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::collection_json("COLL0003", 5, "C"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let keys = vec![
        common::key("COLL0001"),
        common::key("COLL0002"),
        common::key("COLL0003"),
    ];
    let collections = fetch::fetch_collections(&client, &common::user_library(), &keys, 2)
        .await
        .expect("fetch failed");

    let names: Vec<&str> = collections.iter().filter_map(|c| c.name()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_fetch_skips_keys_the_server_does_not_return() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::item_json("ITEM0001", 10, "Only", false),
        ])))
        .mount(&server)
        .await;

    let keys = vec![common::key("ITEM0001"), common::key("GONE0001")];
    let items = fetch::fetch_items(&client, &common::user_library(), &keys, 50)
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key.as_str(), "ITEM0001");
}

#[tokio::test]
async fn test_fetch_rejects_unrequested_objects() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::item_json("ITEM0001", 10, "Asked", false),
            common::item_json("OTHER001", 10, "Not asked", false),
        ])))
        .mount(&server)
        .await;

    let keys = vec![common::key("ITEM0001")];
    let result = fetch::fetch_items(&client, &common::user_library(), &keys, 50).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_fetch_server_error_is_error() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = fetch::fetch_items(&client, &common::user_library(), &[common::key("ITEM0001")], 50)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("500"));
}
