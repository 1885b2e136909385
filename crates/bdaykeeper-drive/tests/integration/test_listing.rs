//! Integration tests for folder listing and metadata lookups

use bdaykeeper_core::ports::IRemoteStore;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_list_folder_single_page() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_listing(
        &server,
        "folder-1",
        serde_json::json!([
            common::file_json("f1", "a.daylio", "2026-01-10T08:00:00Z"),
            common::file_json("f2", "notes.txt", "2026-01-11T08:00:00Z"),
        ]),
    )
    .await;

    let files = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .expect("listing failed");

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].id.as_str(), "f1");
    assert_eq!(files[0].name, "a.daylio");
    assert_eq!(files[0].size_bytes, 1024);
    assert_eq!(files[1].name, "notes.txt");
}

#[tokio::test]
async fn test_list_folder_follows_pagination() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_listing_paginated(
        &server,
        serde_json::json!([common::file_json("p1", "one.daylio", "2026-01-10T08:00:00Z")]),
        serde_json::json!([
            common::file_json("p2", "two.daylio", "2026-01-12T08:00:00Z"),
            common::file_json("p3", "three.daylio", "2026-01-13T08:00:00Z"),
        ]),
    )
    .await;

    let files = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .expect("listing failed");

    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn test_list_folder_requests_expected_fields() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param(
            "fields",
            "nextPageToken, files(id, name, mimeType, size, modifiedTime)",
        ))
        .and(query_param("pageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})))
        .expect(1)
        .mount(&server)
        .await;

    let files = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .expect("listing failed");
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_list_folder_skips_malformed_entries() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_listing(
        &server,
        "folder-1",
        serde_json::json!([
            {"id": "no-time", "name": "x.daylio"},
            common::file_json("ok", "y.daylio", "2026-01-10T08:00:00Z"),
        ]),
    )
    .await;

    let files = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .expect("listing failed");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id.as_str(), "ok");
}

#[tokio::test]
async fn test_list_folder_folder_entry_has_zero_size() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_listing(
        &server,
        "folder-1",
        serde_json::json!([{
            "id": "sub",
            "name": "Archive",
            "mimeType": "application/vnd.google-apps.folder",
            "modifiedTime": "2026-01-10T08:00:00Z"
        }]),
    )
    .await;

    let files = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .expect("listing failed");
    assert_eq!(files[0].size_bytes, 0);
}

#[tokio::test]
async fn test_get_file_info() {
    let (server, store) = common::setup_store_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/f9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json(
            "f9",
            "latest.daylio",
            "2026-02-01T12:30:00.125Z",
        )))
        .mount(&server)
        .await;

    let meta = store
        .get_file_info(&common::remote_id("f9"))
        .await
        .expect("get_file_info failed");
    assert_eq!(meta.name, "latest.daylio");
    assert_eq!(meta.modified_at_millis() % 1000, 125);
}

#[tokio::test]
async fn test_store_lists_through_port() {
    let (server, store) = common::setup_store_mock().await;
    common::mount_listing(
        &server,
        "folder-2",
        serde_json::json!([common::file_json("f1", "a.daylio", "2026-01-10T08:00:00Z")]),
    )
    .await;

    let files = store
        .list_files_in_folder(&common::remote_id("folder-2"))
        .await
        .expect("listing failed");
    assert_eq!(files.len(), 1);
}
