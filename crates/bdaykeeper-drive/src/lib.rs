//! bdaykeeper Drive - Google Drive v3 client
//!
//! Provides an async, read-only client for:
//! - Listing the files of a folder (with pagination)
//! - Fetching a single file's metadata
//! - Streaming a file's content
//! - OAuth2 refresh-token authentication with keyring-backed storage
//!
//! ## Modules
//!
//! - [`auth`] - Token storage and credential sources
//! - [`client`] - Google Drive REST client
//! - [`provider`] - [`IRemoteStore`](bdaykeeper_core::ports::IRemoteStore) adapter

pub mod auth;
pub mod client;
pub mod provider;

use std::time::Duration;

use bdaykeeper_core::ports::RemoteStoreError;
use thiserror::Error;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Credentials are missing, invalid or expired (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested file or folder does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (429)
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Server-suggested wait, when a `Retry-After` header was sent
        retry_after: Option<Duration>,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Any other error status
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request did not complete within its timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for DriveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DriveError::Timeout(e.to_string())
        } else if e.is_decode() {
            DriveError::InvalidResponse(e.to_string())
        } else {
            DriveError::NetworkError(e.to_string())
        }
    }
}

impl From<DriveError> for RemoteStoreError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::Unauthorized(msg) => RemoteStoreError::Auth(msg),
            DriveError::NotFound(msg) => RemoteStoreError::Api {
                status: 404,
                message: msg,
            },
            DriveError::TooManyRequests { retry_after } => RemoteStoreError::Api {
                status: 429,
                message: format!("Too many requests, retry after {retry_after:?}"),
            },
            DriveError::ServerError { status, message }
            | DriveError::Rejected { status, message } => {
                RemoteStoreError::Api { status, message }
            }
            DriveError::Timeout(msg) => RemoteStoreError::Timeout(msg),
            DriveError::NetworkError(msg) => RemoteStoreError::Network(msg),
            DriveError::InvalidResponse(msg) => RemoteStoreError::InvalidResponse(msg),
        }
    }
}
