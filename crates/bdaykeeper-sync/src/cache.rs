//! Local cache file
//!
//! The cache is a single file whose modification time mirrors the remote
//! `modifiedAt` of the copy it holds. It is only ever replaced whole:
//!
//! - **Atomic replace**: content is streamed into a uniquely named hidden
//!   sibling (`.<name>.XXXXXX.partial`), flushed and fsynced, stamped with
//!   the remote timestamp, then renamed over the cache file. A pass that
//!   fails or is cancelled midway leaves the previous cache untouched, and
//!   overlapping passes never share a staging file.
//! - **Timestamp mirroring**: the staleness check compares the file's
//!   mtime with the remote timestamp at millisecond precision.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::SystemTime,
};

use bdaykeeper_core::{domain::LocalCacheEntry, ports::ByteStream};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::SyncError;

/// Suffix of the staging files written next to the cache
pub const STAGING_SUFFIX: &str = ".partial";

/// Handle to the cache file at a fixed path
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current state of the cache file
    ///
    /// A path that exists but is not a regular file counts as missing, so
    /// the next replacement surfaces the conflict as an I/O error.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn entry(&self) -> Result<LocalCacheEntry, SyncError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("cache file not found");
                return Ok(LocalCacheEntry::missing(&self.path));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            warn!("cache path is not a regular file");
            return Ok(LocalCacheEntry::missing(&self.path));
        }

        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        debug!(modified = ?modified, size = metadata.len(), "cache file present");

        Ok(LocalCacheEntry {
            path: self.path.clone(),
            exists: true,
            last_modified_at: modified,
        })
    }

    /// Replaces the cache with the streamed content
    ///
    /// The file's mtime is set to `modified_at` before it becomes visible.
    /// When `expected_size` is given, a shorter or longer body is rejected.
    /// Concurrent replacements each stage privately; the last one to commit
    /// wins and the cache always holds one complete body.
    ///
    /// # Returns
    /// The number of bytes written
    #[instrument(skip(self, stream), fields(path = %self.path.display()))]
    pub async fn replace_from_stream(
        &self,
        stream: ByteStream,
        modified_at: DateTime<Utc>,
        expected_size: Option<u64>,
    ) -> Result<u64, SyncError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        let prefix = format!(".{}.", self.file_name());
        let staged = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(STAGING_SUFFIX)
                .tempfile_in(&parent)
        })
        .await
        .map_err(std::io::Error::other)??;
        let (file, staging_path) = staged.into_parts();
        debug!(staging = %staging_path.display(), "writing to staging file");

        // Dropping `staging_path` on any error below removes the staging file
        let written = write_staged(
            tokio::fs::File::from_std(file),
            stream,
            modified_at,
            expected_size,
        )
        .await?;

        commit(staging_path, self.path.clone()).await?;
        debug!(bytes = written, "cache replaced");
        Ok(written)
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

async fn write_staged(
    mut file: tokio::fs::File,
    mut stream: ByteStream,
    modified_at: DateTime<Utc>,
    expected_size: Option<u64>,
) -> Result<u64, SyncError> {
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    if let Some(expected) = expected_size {
        if expected != written {
            return Err(SyncError::Truncated {
                expected,
                actual: written,
            });
        }
    }

    file.flush().await?;
    file.sync_all().await?;

    let std_file = file.into_std().await;
    let mtime = SystemTime::from(modified_at);
    tokio::task::spawn_blocking(move || std_file.set_modified(mtime))
        .await
        .map_err(std::io::Error::other)??;

    Ok(written)
}

/// Renames the staging file over the cache file
async fn commit(staging_path: TempPath, target: PathBuf) -> Result<(), SyncError> {
    tokio::task::spawn_blocking(move || staging_path.persist(&target))
        .await
        .map_err(std::io::Error::other)?
        .map_err(|e| SyncError::IoError(e.error))
}
