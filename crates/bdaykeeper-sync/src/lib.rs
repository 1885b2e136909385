//! bdaykeeper Sync - Local cache synchronization
//!
//! Provides:
//! - The sync pass: list the remote folder, pick the newest candidate,
//!   refresh the local cache when it is missing or stale
//! - Atomic cache replacement that never exposes a partial file
//! - A JSON-file settings store
//! - The periodic trigger that drives passes and backs off on failure
//!
//! ## Modules
//!
//! - [`cache`] - Local cache file inspection and atomic replacement
//! - [`engine`] - Single sync pass and its classified outcome
//! - [`settings`] - JSON-file [`ISettingsStore`](bdaykeeper_core::ports::ISettingsStore)
//! - [`trigger`] - Interval loop with exponential backoff

pub mod cache;
pub mod engine;
pub mod settings;
pub mod trigger;

use bdaykeeper_core::ports::RemoteStoreError;
use thiserror::Error;

/// Errors that can occur during a sync pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred while reading or replacing the cache
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The remote store failed
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteStoreError),

    /// The target settings could not be resolved
    #[error("Configuration error: {0}")]
    Config(String),

    /// No folder id is configured in any layer
    #[error("Target folder is not configured")]
    FolderNotConfigured,

    /// The download ended before the announced size was reached
    #[error("Download truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },
}

impl SyncError {
    /// Returns true if a later pass may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::IoError(_) | SyncError::Truncated { .. } => true,
            SyncError::Remote(e) => e.is_retryable(),
            SyncError::Config(_) | SyncError::FolderNotConfigured => false,
        }
    }

    /// Returns true for credential/initialization failures
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_auth())
    }
}
