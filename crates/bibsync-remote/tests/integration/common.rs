//! Shared test helpers for Web API integration tests
//!
//! Provides wiremock-based mock server setup and JSON builders for the
//! object envelopes the Web API returns.

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bibsync_core::domain::{EntityKey, GroupId, LibraryId, UserId};
use bibsync_remote::client::ZoteroClient;

pub const USER_ID: u64 = 475425;
pub const API_KEY: &str = "test-api-key";

/// Starts a mock server and returns a client pointing at it
pub async fn setup_zotero_mock() -> (MockServer, ZoteroClient) {
    let server = MockServer::start().await;
    let client = ZoteroClient::with_base_url(Some(API_KEY.to_string()), server.uri());
    (server, client)
}

pub fn user_library() -> LibraryId {
    LibraryId::User(UserId::new(USER_ID))
}

#[allow(dead_code)]
pub fn group_library(id: u64) -> LibraryId {
    LibraryId::Group(GroupId::new(id))
}

pub fn key(s: &str) -> EntityKey {
    EntityKey::new(s.to_string()).unwrap()
}

/// A `format=json` item envelope
pub fn item_json(key: &str, version: u64, title: &str, deleted: bool) -> Value {
    let mut data = json!({
        "key": key,
        "version": version,
        "itemType": "journalArticle",
        "title": title,
    });
    if deleted {
        data["deleted"] = json!(1);
    }
    json!({
        "key": key,
        "version": version,
        "library": {"type": "user", "id": USER_ID},
        "data": data,
    })
}

/// A `format=json` collection envelope
pub fn collection_json(key: &str, version: u64, name: &str) -> Value {
    json!({
        "key": key,
        "version": version,
        "data": {"key": key, "version": version, "name": name, "parentCollection": false},
    })
}

/// Mounts a `format=versions` endpoint for `since` answering `body`
pub async fn mount_versions(
    server: &MockServer,
    endpoint: &str,
    since: u64,
    library_version: Option<u64>,
    body: Value,
) {
    let mut response = ResponseTemplate::new(200).set_body_json(body);
    if let Some(v) = library_version {
        response = response.insert_header("Last-Modified-Version", v.to_string().as_str());
    }
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("since", since.to_string().as_str()))
        .and(query_param("format", "versions"))
        .and(header("If-Modified-Since-Version", since.to_string().as_str()))
        .and(header("Zotero-API-Key", API_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts `{endpoint}` answering 304 Not Modified for any request
pub async fn mount_not_modified(server: &MockServer, endpoint: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(304))
        .mount(server)
        .await;
}
