//! Integration tests for streamed downloads

use bdaykeeper_core::ports::IRemoteStore;
use futures_util::StreamExt;

use crate::common;

async fn collect(mut stream: bdaykeeper_core::ports::ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.expect("chunk failed"));
    }
    out
}

#[tokio::test]
async fn test_download_returns_content() {
    let (server, client) = common::setup_drive_mock().await;
    let content = b"daylio export bytes";
    common::mount_download(&server, "download-001", content).await;

    let stream = client
        .download(&common::remote_id("download-001"))
        .await
        .expect("download failed");

    assert_eq!(collect(stream).await, content);
}

#[tokio::test]
async fn test_download_large_file() {
    let (server, store) = common::setup_store_mock().await;
    let content: Vec<u8> = (0..1_048_576).map(|i| (i % 251) as u8).collect();
    common::mount_download(&server, "large-001", &content).await;

    let stream = store
        .download_file(&common::remote_id("large-001"))
        .await
        .expect("download failed");

    let data = collect(stream).await;
    assert_eq!(data.len(), 1_048_576);
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_download_empty_file() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_download(&server, "empty-001", &[]).await;

    let stream = client
        .download(&common::remote_id("empty-001"))
        .await
        .expect("download failed");

    assert!(collect(stream).await.is_empty());
}
