//! Remote store port (driven/secondary port)
//!
//! Read-only access to a cloud folder: list its files, fetch one file's
//! metadata, stream one file's bytes. The primary implementation targets
//! Google Drive, but the trait is provider-agnostic.
//!
//! ## Design Notes
//!
//! - Errors are classified ([`RemoteStoreError`]) so the sync engine can tell
//!   retryable conditions from configuration mistakes without string matching.
//! - [`IRemoteStore::initialize`] must succeed before any other call; calls
//!   made earlier fail with [`RemoteStoreError::NotReady`].

use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::domain::{file_metadata::FileMetadata, newtypes::RemoteId};

/// Stream of downloaded content chunks
///
/// The caller owns the stream and must drain or drop it.
pub type ByteStream = BoxStream<'static, Result<Bytes, RemoteStoreError>>;

/// Errors surfaced by a remote store
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    /// An operation was attempted before a successful `initialize()`
    #[error("Remote store is not initialized")]
    NotReady,

    /// Credentials could not be obtained or were rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection-level failure (DNS, refused, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The per-call timeout elapsed
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The provider answered with an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider message or reason phrase
        message: String,
    },

    /// The provider answered with a body that could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteStoreError {
    /// Returns true if a later attempt may succeed without operator action
    ///
    /// Everything except `NotReady` (a wiring mistake) and
    /// `InvalidResponse` (a protocol mismatch) is worth retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotReady | Self::InvalidResponse(_))
    }

    /// Returns true for authentication/initialization failures
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Token returned by a successful [`IRemoteStore::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready;

/// Port trait for read-only cloud folder access
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Establishes credentials
    ///
    /// Safe to call repeatedly; only one underlying session is kept and it is
    /// refreshed when its credentials are close to expiry.
    async fn initialize(&self) -> Result<Ready, RemoteStoreError>;

    /// Lists the non-trashed direct children of a folder
    ///
    /// Implementations follow provider pagination until the last page.
    async fn list_files_in_folder(
        &self,
        folder_id: &RemoteId,
    ) -> Result<Vec<FileMetadata>, RemoteStoreError>;

    /// Retrieves metadata for a single file
    async fn get_file_info(&self, file_id: &RemoteId) -> Result<FileMetadata, RemoteStoreError>;

    /// Opens a content stream for a file
    async fn download_file(&self, file_id: &RemoteId) -> Result<ByteStream, RemoteStoreError>;
}
