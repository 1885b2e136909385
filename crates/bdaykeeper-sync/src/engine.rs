//! Cache synchronization engine
//!
//! The [`SyncEngine`] runs one sync pass: it resolves the target settings,
//! lists the remote folder, decides whether the cached copy is stale and,
//! if so, streams the newest candidate into the cache.
//!
//! ## Sync Flow
//!
//! 1. **Resolve**: folder id, cache file name and suffix from the config source
//!    (the notification instant is never composed here)
//! 2. **List**: initialize the remote store and list the folder
//! 3. **Decide**: newest candidate by `modifiedAt` against the cache mtime
//! 4. **Fetch**: download and atomically replace the cache
//!
//! ## Outcome Classification
//!
//! Every pass ends in exactly one [`PassOutcome`]. Network, API, auth and
//! I/O failures are `Retry`; an unconfigured folder or an unparseable
//! provider response is `Failure`.
//!
//! The engine keeps no state between passes. Overlapping passes each stage
//! their download privately and the last commit wins, so the cache always
//! holds one complete copy.

use std::{path::PathBuf, sync::Arc, time::Instant};

use bdaykeeper_core::{
    domain::{decide, SyncDecision},
    ports::{IConfigSource, IRemoteStore},
};
use tracing::{debug, info, instrument};

use crate::{cache::LocalCache, SyncError};

// ============================================================================
// Pass results
// ============================================================================

/// Summary of a completed sync pass
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// What the pass decided
    pub decision: SyncDecision,
    /// Location of the cache file
    pub cache_path: PathBuf,
    /// Bytes written to the cache (0 unless the decision was `Fetch`)
    pub bytes_written: u64,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

/// Classified result of a sync pass, as reported to the periodic trigger
#[derive(Debug)]
pub enum PassOutcome {
    Success(SyncReport),
    /// Transient failure; a later pass may succeed
    Retry(SyncError),
    /// Terminal failure; retrying will not help until configuration changes
    Failure(SyncError),
}

impl PassOutcome {
    /// Classifies a pass result
    pub fn from_result(result: Result<SyncReport, SyncError>) -> Self {
        match result {
            Ok(report) => PassOutcome::Success(report),
            Err(e) if e.is_retryable() => PassOutcome::Retry(e),
            Err(e) => PassOutcome::Failure(e),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PassOutcome::Success(_) => "success",
            PassOutcome::Retry(_) => "retry",
            PassOutcome::Failure(_) => "failure",
        }
    }
}

/// Anything the periodic trigger can drive
#[async_trait::async_trait]
pub trait SyncPass: Send + Sync {
    /// Runs one pass; never panics on I/O or remote failures
    async fn run_pass(&self) -> PassOutcome;
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Refreshes the local cache from the newest remote candidate
pub struct SyncEngine {
    remote_store: Arc<dyn IRemoteStore>,
    config_source: Arc<dyn IConfigSource>,
    cache_dir: PathBuf,
}

impl SyncEngine {
    /// Creates a new engine
    ///
    /// # Arguments
    /// * `remote_store` - Cloud folder to read from
    /// * `config_source` - Resolves folder id, file name and suffix per pass
    /// * `cache_dir` - Directory holding the cache file
    pub fn new(
        remote_store: Arc<dyn IRemoteStore>,
        config_source: Arc<dyn IConfigSource>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote_store,
            config_source,
            cache_dir: cache_dir.into(),
        }
    }

    /// Resolves the target and decides, without downloading anything
    #[instrument(skip(self))]
    pub async fn plan(&self) -> Result<SyncDecision, SyncError> {
        Ok(self.prepare().await?.0)
    }

    /// Runs one sync pass and returns its report or the first error
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let (decision, cache) = self.prepare().await?;

        let bytes_written = match &decision {
            SyncDecision::NoCandidates => 0,
            SyncDecision::UpToDate => {
                debug!(path = %cache.path().display(), "Cache is up to date");
                0
            }
            SyncDecision::Fetch(candidate) => {
                info!(
                    id = %candidate.id,
                    name = %candidate.name,
                    modified_at = %candidate.modified_at,
                    "Fetching newer remote copy"
                );
                let stream = self.remote_store.download_file(&candidate.id).await?;
                let expected = (candidate.size_bytes > 0).then_some(candidate.size_bytes);
                cache
                    .replace_from_stream(stream, candidate.modified_at, expected)
                    .await?
            }
        };

        Ok(SyncReport {
            decision,
            cache_path: cache.path().to_path_buf(),
            bytes_written,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Lists the folder and compares the newest candidate with the cache
    async fn prepare(&self) -> Result<(SyncDecision, LocalCache), SyncError> {
        let settings = self
            .config_source
            .sync_target()
            .map_err(|e| SyncError::Config(format!("{e:#}")))?;
        let folder_id = settings
            .folder_id
            .clone()
            .ok_or(SyncError::FolderNotConfigured)?;

        self.remote_store.initialize().await?;
        let files = self.remote_store.list_files_in_folder(&folder_id).await?;
        debug!(folder = %folder_id, files = files.len(), "Listed remote folder");

        let cache = LocalCache::new(self.cache_dir.join(&settings.file_name));
        let entry = cache.entry().await?;
        let decision = decide(&files, &settings.match_suffix, &entry);

        if let SyncDecision::NoCandidates = decision {
            info!(
                folder = %folder_id,
                suffix = %settings.match_suffix,
                "No remote file matches the suffix"
            );
        }
        Ok((decision, cache))
    }
}

#[async_trait::async_trait]
impl SyncPass for SyncEngine {
    async fn run_pass(&self) -> PassOutcome {
        let outcome = PassOutcome::from_result(self.sync().await);
        if let PassOutcome::Success(report) = &outcome {
            info!(
                decision = report.decision.label(),
                bytes = report.bytes_written,
                duration_ms = report.duration_ms,
                "Sync pass complete"
            );
        }
        outcome
    }
}
