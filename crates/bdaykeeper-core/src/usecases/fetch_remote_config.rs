//! Remote configuration fetch use case
//!
//! Looks up the configuration document in the cloud folder, downloads and
//! validates it, and replaces the cached snapshot in the settings store when
//! the downloaded one is strictly newer. A bad document never touches the
//! cache.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::{
    domain::{FileMetadata, RemoteConfigDocument, RemoteId},
    ports::{keys, IRemoteStore, ISettingsStore, SettingsError},
};

/// Upper bound for a configuration document download
const MAX_DOCUMENT_BYTES: usize = 64 * 1024;

/// Result of a fetch attempt that produced a valid document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteConfigOutcome {
    /// The downloaded snapshot replaced the cached one
    Applied(RemoteConfigDocument),
    /// The cached snapshot is as new as the downloaded one
    AlreadyCurrent,
}

/// Use case for refreshing the cached remote configuration
pub struct FetchRemoteConfigUseCase {
    remote_store: Arc<dyn IRemoteStore>,
    settings: Arc<dyn ISettingsStore>,
    document_name: String,
}

impl FetchRemoteConfigUseCase {
    /// Creates the use case
    ///
    /// # Arguments
    ///
    /// * `remote_store` - Cloud store to list and download from
    /// * `settings` - Store holding the cached snapshot
    /// * `document_name` - Exact file name of the configuration document
    pub fn new(
        remote_store: Arc<dyn IRemoteStore>,
        settings: Arc<dyn ISettingsStore>,
        document_name: impl Into<String>,
    ) -> Self {
        Self {
            remote_store,
            settings,
            document_name: document_name.into(),
        }
    }

    /// Fetches the document from `folder_id` and reports whether a valid
    /// one was obtained
    ///
    /// Returns `true` when the document was applied or the cache was already
    /// current, `false` on any failure. Failures are logged, never
    /// propagated, and leave the cached snapshot unchanged.
    pub async fn execute(&self, folder_id: &RemoteId) -> bool {
        match self.try_fetch(folder_id).await {
            Ok(RemoteConfigOutcome::Applied(doc)) => {
                info!(
                    folder = %folder_id,
                    version = doc.version,
                    last_updated = doc.last_updated,
                    "Applied remote configuration"
                );
                true
            }
            Ok(RemoteConfigOutcome::AlreadyCurrent) => {
                debug!(folder = %folder_id, "Remote configuration already current");
                true
            }
            Err(e) => {
                warn!(folder = %folder_id, error = %format!("{e:#}"), "Remote configuration fetch failed");
                false
            }
        }
    }

    /// Same as [`execute`](Self::execute) but returns the outcome or the
    /// error instead of collapsing them into a flag
    pub async fn try_fetch(&self, folder_id: &RemoteId) -> Result<RemoteConfigOutcome> {
        self.remote_store
            .initialize()
            .await
            .context("Remote store not available")?;

        let files = self
            .remote_store
            .list_files_in_folder(folder_id)
            .await
            .context("Failed to list configuration folder")?;

        let Some(file) = newest_named(&files, &self.document_name) else {
            bail!("No '{}' found in folder {}", self.document_name, folder_id);
        };

        let bytes = self.download(file).await?;
        let doc = RemoteConfigDocument::parse(&bytes)
            .with_context(|| format!("Rejected '{}'", file.name))?;

        // Settings stores may block on file I/O
        let settings = self.settings.clone();
        let candidate = doc.clone();
        let applied = tokio::task::spawn_blocking(move || -> Result<bool> {
            let cached = load_cached_document(settings.as_ref())
                .context("Failed to read cached remote configuration")?;
            if !candidate.supersedes(cached.as_ref()) {
                return Ok(false);
            }
            store_document(settings.as_ref(), &candidate)
                .context("Failed to persist remote configuration")?;
            Ok(true)
        })
        .await
        .context("Settings update task failed")??;

        if applied {
            Ok(RemoteConfigOutcome::Applied(doc))
        } else {
            Ok(RemoteConfigOutcome::AlreadyCurrent)
        }
    }

    async fn download(&self, file: &FileMetadata) -> Result<Vec<u8>> {
        let mut stream = self
            .remote_store
            .download_file(&file.id)
            .await
            .with_context(|| format!("Failed to download '{}'", file.name))?;

        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("Download of '{}' failed", file.name))?;
            if buf.len() + chunk.len() > MAX_DOCUMENT_BYTES {
                bail!(
                    "'{}' exceeds {} bytes, refusing to parse",
                    file.name,
                    MAX_DOCUMENT_BYTES
                );
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }
}

/// Newest file with exactly `name`; the first one listed wins a tie
fn newest_named<'a>(files: &'a [FileMetadata], name: &str) -> Option<&'a FileMetadata> {
    files
        .iter()
        .filter(|f| f.name == name)
        .fold(None, |best: Option<&FileMetadata>, f| match best {
            Some(b) if b.modified_at_millis() >= f.modified_at_millis() => Some(b),
            _ => Some(f),
        })
}

// ============================================================================
// Cached snapshot persistence
// ============================================================================

/// Reads the cached snapshot, if a complete one is stored
///
/// A partially stored snapshot (any key missing or unparsable) reads as
/// absent.
pub fn load_cached_document(
    settings: &dyn ISettingsStore,
) -> Result<Option<RemoteConfigDocument>, SettingsError> {
    let int = |key: &str| settings.get_i64(key);

    let (
        Some(version),
        Some(year),
        Some(month),
        Some(day),
        Some(hour),
        Some(minute),
        Some(last_updated),
    ) = (
        int(keys::REMOTE_VERSION)?,
        int(keys::REMOTE_BIRTHDAY_YEAR)?,
        int(keys::REMOTE_BIRTHDAY_MONTH)?,
        int(keys::REMOTE_BIRTHDAY_DAY)?,
        int(keys::REMOTE_BIRTHDAY_HOUR)?,
        int(keys::REMOTE_BIRTHDAY_MINUTE)?,
        int(keys::REMOTE_LAST_UPDATED)?,
    )
    else {
        return Ok(None);
    };
    let Some(file_name) = settings.get(keys::REMOTE_FILE_NAME)? else {
        return Ok(None);
    };

    let component = |v: i64| u32::try_from(v).ok();
    let (Ok(year), Some(month), Some(day), Some(hour), Some(minute)) = (
        i32::try_from(year),
        component(month),
        component(day),
        component(hour),
        component(minute),
    ) else {
        return Ok(None);
    };

    Ok(Some(RemoteConfigDocument {
        version,
        birthday_year: year,
        birthday_month: month,
        birthday_day: day,
        birthday_hour: hour,
        birthday_minute: minute,
        daylio_file_name: file_name,
        last_updated,
    }))
}

/// Replaces the cached snapshot in one durable update
pub fn store_document(
    settings: &dyn ISettingsStore,
    doc: &RemoteConfigDocument,
) -> Result<(), SettingsError> {
    settings.set_many(&[
        (keys::REMOTE_VERSION, doc.version.to_string()),
        (keys::REMOTE_BIRTHDAY_YEAR, doc.birthday_year.to_string()),
        (keys::REMOTE_BIRTHDAY_MONTH, doc.birthday_month.to_string()),
        (keys::REMOTE_BIRTHDAY_DAY, doc.birthday_day.to_string()),
        (keys::REMOTE_BIRTHDAY_HOUR, doc.birthday_hour.to_string()),
        (keys::REMOTE_BIRTHDAY_MINUTE, doc.birthday_minute.to_string()),
        (keys::REMOTE_FILE_NAME, doc.daylio_file_name.clone()),
        (keys::REMOTE_LAST_UPDATED, doc.last_updated.to_string()),
    ])
}
