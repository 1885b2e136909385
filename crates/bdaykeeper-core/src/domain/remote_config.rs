//! Remote configuration document
//!
//! A versioned JSON snapshot stored next to the export files in the cloud
//! folder. A newer snapshot (greater `last_updated`) replaces the cached
//! one wholesale; snapshots are never merged field by field.
//!
//! ```json
//! {
//!   "version": 1,
//!   "birthday_year": 2025, "birthday_month": 6, "birthday_day": 14,
//!   "birthday_hour": 9, "birthday_minute": 0,
//!   "daylio_file_name": "backup.daylio",
//!   "last_updated": 1718000000000
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::target::BirthdayTarget;

/// Errors raised while reading a remote configuration document
#[derive(Debug, Error)]
pub enum RemoteConfigError {
    /// The document is not valid JSON or misses a required field
    #[error("Malformed remote config: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document parsed but carries unacceptable values
    #[error("Invalid remote config: {0}")]
    Invalid(String),
}

/// Immutable snapshot of the remote configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfigDocument {
    /// Schema version, must be at least 1
    pub version: i64,
    pub birthday_year: i32,
    pub birthday_month: u32,
    pub birthday_day: u32,
    pub birthday_hour: u32,
    pub birthday_minute: u32,
    /// Name of the export file to cache locally
    pub daylio_file_name: String,
    /// Publication instant in milliseconds since the Unix epoch
    pub last_updated: i64,
}

impl RemoteConfigDocument {
    /// Parses and validates a document from raw JSON bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, RemoteConfigError> {
        let doc: Self = serde_json::from_slice(bytes)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Checks version, date/time ranges and the file name
    pub fn validate(&self) -> Result<(), RemoteConfigError> {
        if self.version < 1 {
            return Err(RemoteConfigError::Invalid(format!(
                "version must be >= 1, got {}",
                self.version
            )));
        }
        if self.daylio_file_name.trim().is_empty() {
            return Err(RemoteConfigError::Invalid(
                "daylio_file_name must not be empty".to_string(),
            ));
        }
        if self.daylio_file_name.contains(['/', '\\']) {
            return Err(RemoteConfigError::Invalid(format!(
                "daylio_file_name must be a bare file name: {}",
                self.daylio_file_name
            )));
        }
        self.target()
            .validate()
            .map_err(|e| RemoteConfigError::Invalid(e.to_string()))
    }

    /// Birthday components carried by the document
    pub fn target(&self) -> BirthdayTarget {
        BirthdayTarget {
            year: self.birthday_year,
            month: self.birthday_month,
            day: self.birthday_day,
            hour: self.birthday_hour,
            minute: self.birthday_minute,
        }
    }

    /// Publication instant as a UTC timestamp
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.last_updated).single()
    }

    /// Returns true if this snapshot should replace `cached`
    ///
    /// Any valid snapshot replaces an empty cache; otherwise `last_updated`
    /// must be strictly greater.
    pub fn supersedes(&self, cached: Option<&RemoteConfigDocument>) -> bool {
        match cached {
            None => true,
            Some(old) => self.last_updated > old.last_updated,
        }
    }
}
