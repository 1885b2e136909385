//! Shared test helpers for Drive API integration tests
//!
//! Each helper mounts the endpoints a test needs on a wiremock server and
//! returns a client or store pointing at it.

use std::sync::Arc;

use bdaykeeper_core::{domain::RemoteId, ports::IRemoteStore};
use bdaykeeper_drive::{
    auth::StaticCredentialSource, client::DriveClient, provider::DriveRemoteStore,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and returns a client authenticated with [`TEST_TOKEN`]
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url(TEST_TOKEN, server.uri());
    (server, client)
}

/// Starts a mock server and returns an initialized [`DriveRemoteStore`]
pub async fn setup_store_mock() -> (MockServer, DriveRemoteStore) {
    let server = MockServer::start().await;
    let store = DriveRemoteStore::new(
        DriveClient::with_base_url("", server.uri()),
        Arc::new(StaticCredentialSource::from_access_token(TEST_TOKEN)),
    );
    store.initialize().await.expect("initialize failed");
    (server, store)
}

pub fn remote_id(id: &str) -> RemoteId {
    RemoteId::new(id).expect("valid id")
}

/// Builds a Drive file resource
pub fn file_json(id: &str, name: &str, modified: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "mimeType": "application/octet-stream",
        "size": "1024",
        "modifiedTime": modified,
    })
}

/// Mounts a single-page listing for `folder_id`
pub async fn mount_listing(server: &MockServer, folder_id: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param(
            "q",
            format!("'{folder_id}' in parents and trashed = false").as_str(),
        ))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files,
        })))
        .mount(server)
        .await;
}

/// Mounts a two-page listing
///
/// The first request (without `pageToken`) returns `page1` and a token;
/// the request carrying that token returns `page2`.
pub async fn mount_listing_paginated(
    server: &MockServer,
    page1: serde_json::Value,
    page2: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page2,
        })))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page1,
            "nextPageToken": "page-2",
        })))
        .with_priority(2)
        .mount(server)
        .await;
}

/// Mounts a media download for `file_id`
pub async fn mount_download(server: &MockServer, file_id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{file_id}").as_str()))
        .and(query_param("alt", "media"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

/// Mounts an error status with a Google error envelope on every path
pub async fn mount_error(server: &MockServer, status: u16, message: &str) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": { "code": status, "message": message }
        })))
        .mount(server)
        .await;
}
