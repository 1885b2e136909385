//! Integration tests for error status classification

use std::time::Duration;

use bdaykeeper_core::ports::{IRemoteStore, RemoteStoreError};
use bdaykeeper_drive::{client::DriveClient, DriveError};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let (server, store) = common::setup_store_mock().await;
    common::mount_error(&server, 401, "Invalid Credentials").await;

    let err = store
        .list_files_in_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();

    assert!(err.is_auth());
    assert!(err.to_string().contains("Invalid Credentials"));
}

#[tokio::test]
async fn test_not_found_keeps_status() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_error(&server, 404, "File not found: f1").await;

    let err = client.get_file(&common::remote_id("f1")).await.unwrap_err();
    assert!(matches!(err, DriveError::NotFound(ref m) if m.contains("f1")));
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveError::TooManyRequests {
            retry_after: Some(d)
        } if d == Duration::from_secs(7)
    ));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let (server, store) = common::setup_store_mock().await;
    common::mount_error(&server, 503, "Backend Error").await;

    let err = store
        .list_files_in_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteStoreError::Api { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_forbidden_is_rejected() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_error(&server, 403, "The user does not have sufficient permissions").await;

    let err = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Rejected { status: 403, .. }));
}

#[tokio::test]
async fn test_invalid_json_is_invalid_response() {
    let (server, store) = common::setup_store_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = store
        .list_files_in_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteStoreError::InvalidResponse(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let (server, _) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"files": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(common::TEST_TOKEN, server.uri())
        .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));
    let err = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Timeout(_)));
}

#[tokio::test]
async fn test_repeated_page_token_is_rejected() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [],
            "nextPageToken": "same",
        })))
        .mount(&server)
        .await;

    let err = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_cycling_page_tokens_are_rejected() {
    let (server, client) = common::setup_drive_mock().await;
    // first page -> "a" -> "b" -> "a" again
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [common::file_json("f2", "two.daylio", "2026-01-11T08:00:00Z")],
            "nextPageToken": "b",
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [common::file_json("f3", "three.daylio", "2026-01-12T08:00:00Z")],
            "nextPageToken": "a",
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [common::file_json("f1", "one.daylio", "2026-01-10T08:00:00Z")],
            "nextPageToken": "a",
        })))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .list_folder(&common::remote_id("folder-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::InvalidResponse(_)));
}
