//! Local cache entry
//!
//! Snapshot of the single cached file on local storage, taken at the start
//! of a sync pass.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// State of the locally cached file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCacheEntry {
    /// Location of the cache file
    pub path: PathBuf,
    /// Whether a regular file exists at `path`
    pub exists: bool,
    /// Modification instant from filesystem metadata (None if unavailable)
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl LocalCacheEntry {
    /// Entry for a cache file that does not exist yet
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exists: false,
            last_modified_at: None,
        }
    }

    /// Entry for an existing cache file with the given modification instant
    pub fn present(path: impl Into<PathBuf>, last_modified_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            exists: true,
            last_modified_at: Some(last_modified_at),
        }
    }

    /// Modification instant truncated to whole milliseconds
    pub fn last_modified_millis(&self) -> Option<i64> {
        self.last_modified_at.map(|t| t.timestamp_millis())
    }
}
