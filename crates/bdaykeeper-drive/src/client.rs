//! Google Drive API client
//!
//! Provides a typed HTTP client for the read-only subset of the Drive v3
//! REST API that bdaykeeper needs. Handles authentication headers,
//! per-call timeouts, status classification and JSON deserialization.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bdaykeeper_core::domain::RemoteId;
//! use bdaykeeper_drive::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("access-token-here");
//! let folder = RemoteId::new("1AbCdEf")?;
//! for file in client.list_folder(&folder).await? {
//!     println!("{} ({} bytes)", file.name, file.size_bytes);
//! }
//! # Ok(())
//! # }
//! ```

use std::{collections::HashSet, time::Duration};

use bdaykeeper_core::{
    domain::{FileMetadata, RemoteId},
    ports::{ByteStream, RemoteStoreError},
};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::{header::RETRY_AFTER, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::DriveError;

/// Base URL for the Google Drive v3 API
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Fields requested for every file resource
const FILE_FIELDS: &str = "id, name, mimeType, size, modifiedTime";

/// Default timeout for listing and metadata calls
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a complete download
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Default number of files per listing page
const DEFAULT_PAGE_SIZE: u32 = 100;

// ============================================================================
// Drive API response types
// ============================================================================

/// A file resource as returned by `files.list` and `files.get`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    /// Decimal string; absent for folders and Google-native documents
    size: Option<String>,
    modified_time: Option<DateTime<Utc>>,
}

/// Response from `GET /files`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    /// Present when more pages follow
    next_page_token: Option<String>,
}

/// Error envelope used by Google APIs
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl DriveFile {
    /// Converts the wire resource into domain metadata
    fn into_metadata(self) -> Result<FileMetadata, DriveError> {
        let id = RemoteId::new(self.id.clone())
            .map_err(|e| DriveError::InvalidResponse(format!("file id {:?}: {e}", self.id)))?;

        let size_bytes = match self.size.as_deref() {
            None => 0,
            Some(s) => s.parse::<u64>().map_err(|_| {
                DriveError::InvalidResponse(format!("file {id}: size {s:?} is not a number"))
            })?,
        };

        let modified_at = self.modified_time.ok_or_else(|| {
            DriveError::InvalidResponse(format!("file {id}: missing modifiedTime"))
        })?;

        Ok(FileMetadata {
            id,
            name: self.name,
            mime_type: self.mime_type,
            size_bytes,
            modified_at,
        })
    }
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with bearer authentication, base URL construction
/// and bounded per-call timeouts.
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
    access_token: String,
    request_timeout: Duration,
    download_timeout: Duration,
    page_size: u32,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DRIVE_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the listing/metadata and download timeouts
    pub fn with_timeouts(mut self, request: Duration, download: Duration) -> Self {
        self.request_timeout = request;
        self.download_timeout = download;
        self
    }

    /// Overrides the listing page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Prepends the base URL, adds the Authorization header and applies the
    /// metadata timeout. Callers streaming content override the timeout.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
            .timeout(self.request_timeout)
    }

    /// Lists the non-trashed direct children of a folder
    ///
    /// Follows `nextPageToken` until the last page. A token the listing has
    /// already handed out fails the call with [`DriveError::InvalidResponse`].
    /// Entries that cannot be converted (malformed id or timestamp) are
    /// skipped with a warning.
    pub async fn list_folder(&self, folder_id: &RemoteId) -> Result<Vec<FileMetadata>, DriveError> {
        let query = format!("'{}' in parents and trashed = false", folder_id.as_str());
        let fields = format!("nextPageToken, files({FILE_FIELDS})");
        let page_size = self.page_size.to_string();

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut page_count: u32 = 0;

        loop {
            page_count += 1;
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .request(Method::GET, "/files")
                .query(&params)
                .send()
                .await?;
            let page: FileListResponse = check_status(response).await?.json().await?;

            debug!(
                folder = %folder_id,
                page = page_count,
                items = page.files.len(),
                has_next = page.next_page_token.is_some(),
                "Received listing page"
            );

            for file in page.files {
                match file.into_metadata() {
                    Ok(meta) => files.push(meta),
                    Err(e) => warn!(folder = %folder_id, error = %e, "Skipping unreadable entry"),
                }
            }

            match page.next_page_token {
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    return Err(DriveError::InvalidResponse(format!(
                        "listing of {folder_id} repeated page token {next:?}"
                    )));
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(folder = %folder_id, total = files.len(), pages = page_count, "Listing complete");
        Ok(files)
    }

    /// Retrieves a single file's metadata
    pub async fn get_file(&self, file_id: &RemoteId) -> Result<FileMetadata, DriveError> {
        let path = format!("/files/{}", file_id.as_str());
        let response = self
            .request(Method::GET, &path)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;
        let file: DriveFile = check_status(response).await?.json().await?;
        file.into_metadata()
    }

    /// Opens a content stream for a file
    ///
    /// The download timeout covers the whole transfer, including the body.
    pub async fn download(&self, file_id: &RemoteId) -> Result<ByteStream, DriveError> {
        let path = format!("/files/{}", file_id.as_str());
        debug!(id = %file_id, "Opening download stream");

        let response = self
            .request(Method::GET, &path)
            .query(&[("alt", "media")])
            .timeout(self.download_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| RemoteStoreError::from(DriveError::from(e))));
        Ok(Box::pin(stream))
    }
}

/// Classifies an error status, consuming the body for its message
async fn check_status(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|env| env.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });

    Err(match status {
        StatusCode::UNAUTHORIZED => DriveError::Unauthorized(message),
        StatusCode::NOT_FOUND => DriveError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests { retry_after },
        s if s.is_server_error() => DriveError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => DriveError::Rejected {
            status: s.as_u16(),
            message,
        },
    })
}

/// Parses a `Retry-After` header given in seconds
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
