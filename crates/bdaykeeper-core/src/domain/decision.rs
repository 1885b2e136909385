//! Sync decision
//!
//! Pure staleness logic: given a remote folder listing and the local cache
//! state, decide whether the cached file must be replaced.
//!
//! ## Tie-break
//!
//! Among candidates with the same (millisecond) modification instant, the one
//! encountered first in the listing wins. Remote listings are returned in a
//! stable order, so repeated passes over the same folder pick the same file.

use super::cache_entry::LocalCacheEntry;
use super::file_metadata::FileMetadata;

/// Outcome of comparing remote candidates against the local cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// No remote file matched the target suffix
    NoCandidates,
    /// The cache is at least as new as the best candidate
    UpToDate,
    /// The candidate must be downloaded and replace the cache
    Fetch(FileMetadata),
}

impl SyncDecision {
    /// Short label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoCandidates => "no_candidates",
            Self::UpToDate => "up_to_date",
            Self::Fetch(_) => "fetch",
        }
    }
}

/// Selects the newest file whose name ends with `suffix`
///
/// Returns the first-encountered file among those sharing the maximum
/// modification instant.
pub fn select_candidate<'a>(files: &'a [FileMetadata], suffix: &str) -> Option<&'a FileMetadata> {
    files
        .iter()
        .filter(|f| f.matches_suffix(suffix))
        .fold(None, |best: Option<&FileMetadata>, file| match best {
            Some(b) if file.modified_at_millis() <= b.modified_at_millis() => Some(b),
            _ => Some(file),
        })
}

/// Decides whether the cache must be refreshed
///
/// - no matching file: [`SyncDecision::NoCandidates`]
/// - cache missing (or its mtime unreadable): [`SyncDecision::Fetch`]
/// - candidate strictly newer than the cache: [`SyncDecision::Fetch`]
/// - otherwise: [`SyncDecision::UpToDate`]
pub fn decide(files: &[FileMetadata], suffix: &str, cache: &LocalCacheEntry) -> SyncDecision {
    let Some(candidate) = select_candidate(files, suffix) else {
        return SyncDecision::NoCandidates;
    };

    if !cache.exists {
        return SyncDecision::Fetch(candidate.clone());
    }

    match cache.last_modified_millis() {
        Some(local) if candidate.modified_at_millis() <= local => SyncDecision::UpToDate,
        _ => SyncDecision::Fetch(candidate.clone()),
    }
}
