//! Integration tests for the IRemoteLibrary adapter

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use bibsync_core::config::RemoteConfig;
use bibsync_core::domain::{
    GroupId, GroupMetadata, Library, QueryStage, UserId, VersionCursor,
};
use bibsync_core::ports::IRemoteLibrary;
use bibsync_core::usecases::PlanDeltaUseCase;
use bibsync_remote::provider::ZoteroRemoteLibrary;

use crate::common;

fn remote_for(uri: String) -> ZoteroRemoteLibrary {
    let config = RemoteConfig {
        base_url: uri,
        ..RemoteConfig::default()
    };
    ZoteroRemoteLibrary::from_config(&config, Some(common::API_KEY.to_string()))
}

#[tokio::test]
async fn test_plan_against_mock_api() {
    let (server, _) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path("/users/475425/deleted"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified-Version", "30")
                .set_body_json(json!({"collections": ["COLL0001"], "items": []})),
        )
        .mount(&server)
        .await;
    common::mount_versions(
        &server,
        "/users/475425/collections",
        10,
        None,
        json!({}),
    )
    .await;
    common::mount_versions(
        &server,
        "/users/475425/items",
        20,
        Some(30),
        json!({"ITEM0003": 30, "ITEM0004": 29}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/users/475425/items"))
        .and(query_param("itemKey", "ITEM0003,ITEM0004"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::item_json("ITEM0004", 29, "Kept", false),
            common::item_json("ITEM0003", 30, "Trashed", true),
        ])))
        .mount(&server)
        .await;

    let remote: Arc<dyn IRemoteLibrary + Send + Sync> = Arc::new(remote_for(server.uri()));
    let library = Library::Personal {
        owner_id: UserId::new(common::USER_ID),
    };

    let plan = PlanDeltaUseCase::new(remote)
        .execute(&library, &VersionCursor::new(10, 20, 25), None)
        .await
        .expect("plan failed");

    assert_eq!(plan.next_versions, VersionCursor::new(10, 30, 30));
    assert!(plan.collections.deleted_keys().contains("COLL0001"));
    assert!(plan.items.deleted_keys().contains("ITEM0003"));
    assert_eq!(plan.items.update_count(), 1);
    assert_eq!(plan.items.updated().next().unwrap().key.as_str(), "ITEM0004");
}

#[tokio::test]
async fn test_plan_reports_failing_stage() {
    let (server, _) = common::setup_zotero_mock().await;

    common::mount_not_modified(&server, "/groups/12/deleted").await;
    common::mount_not_modified(&server, "/groups/12/items").await;
    Mock::given(method("GET"))
        .and(path("/groups/12/collections"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let remote: Arc<dyn IRemoteLibrary + Send + Sync> = Arc::new(remote_for(server.uri()));
    let library = Library::Group {
        group_id: GroupId::new(12),
        group_metadata: GroupMetadata::new("Lab", 1),
    };

    let err = PlanDeltaUseCase::new(remote)
        .execute(&library, &VersionCursor::zero(), None)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(QueryStage::CollectionVersions));
    assert!(err.to_string().contains("groups/12"));
}
