//! Integration tests for throttling retries

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use bibsync_remote::delta;

use crate::common;

#[tokio::test]
async fn test_retries_after_429() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified-Version", "8")
                .set_body_json(json!({"collections": [], "items": ["ITEM0001"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = delta::get_deletions(&client, &common::user_library(), 0)
        .await
        .expect("should succeed after retries")
        .unwrap();

    assert_eq!(response.version, Some(8));
    assert_eq!(response.data.items.len(), 1);
}

#[tokio::test]
async fn test_retries_after_503_with_backoff() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .respond_with(ResponseTemplate::new(503).insert_header("Backoff", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let response = delta::get_deletions(&client, &common::user_library(), 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.version, None);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let (server, client) = common::setup_zotero_mock().await;
    let client = client.with_max_retries(1);

    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let err = delta::get_deletions(&client, &common::user_library(), 0)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Too many requests"));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid 'since'"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(delta::get_deletions(&client, &common::user_library(), 0)
        .await
        .is_err());
}
