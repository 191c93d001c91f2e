//! Integration tests for API key introspection and group listing

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bibsync_core::domain::{GroupId, UserId};
use bibsync_remote::account;
use bibsync_remote::client::ZoteroClient;

use crate::common;

fn group_json(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "version": 2,
        "data": {"id": id, "version": 2, "name": name, "owner": common::USER_ID, "type": "Private"}
    })
}

#[tokio::test]
async fn test_current_key_resolves_user() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/keys/current"))
        .and(header("Zotero-API-Key", common::API_KEY))
        .and(header("Zotero-API-Version", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": common::API_KEY,
            "userID": common::USER_ID,
            "username": "reader",
            "access": {}
        })))
        .mount(&server)
        .await;

    let user = account::current_key(&client).await.expect("key lookup failed");

    assert_eq!(user.id, UserId::new(common::USER_ID));
    assert_eq!(user.username.as_deref(), Some("reader"));
}

#[tokio::test]
async fn test_current_key_without_key_fails_fast() {
    let server = MockServer::start().await;
    let client = ZoteroClient::with_base_url(None, server.uri());

    let err = account::current_key(&client).await.unwrap_err();
    assert!(err.to_string().contains("Unauthorized"));
}

#[tokio::test]
async fn test_current_key_rejected() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/keys/current"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid key"))
        .mount(&server)
        .await;

    assert!(account::current_key(&client).await.is_err());
}

#[tokio::test]
async fn test_user_groups_single_page() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/groups"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Total-Results", "2")
                .set_body_json(json!([group_json(20, "Beta"), group_json(10, "Alpha")])),
        )
        .mount(&server)
        .await;

    let groups = account::user_groups(&client, &UserId::new(common::USER_ID))
        .await
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].id, GroupId::new(20));
    assert_eq!(groups[0].metadata.name, "Beta");
    assert_eq!(groups[1].metadata.owner, Some(UserId::new(common::USER_ID)));
}

#[tokio::test]
async fn test_user_groups_follows_paging() {
    let (server, client) = common::setup_zotero_mock().await;

    let first_page: Vec<_> = (0..100).map(|i| group_json(1000 + i, "G")).collect();
    Mock::given(method("GET"))
        .and(path("/users/475425/groups"))
        .and(query_param("start", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Total-Results", "101")
                .set_body_json(json!(first_page)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/475425/groups"))
        .and(query_param("start", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Total-Results", "101")
                .set_body_json(json!([group_json(5, "Last")])),
        )
        .mount(&server)
        .await;

    let groups = account::user_groups(&client, &UserId::new(common::USER_ID))
        .await
        .unwrap();

    assert_eq!(groups.len(), 101);
    assert_eq!(groups[100].metadata.name, "Last");
}

#[tokio::test]
async fn test_user_groups_empty() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/groups"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Total-Results", "0")
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let groups = account::user_groups(&client, &UserId::new(common::USER_ID))
        .await
        .unwrap();
    assert!(groups.is_empty());
}
