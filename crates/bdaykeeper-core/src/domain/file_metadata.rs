//! Remote file metadata
//!
//! [`FileMetadata`] is produced by the remote store for every listed or
//! fetched file. It is immutable and only ever compared by its
//! modification instant and its name suffix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// Metadata of a single file in the cloud store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Opaque provider identifier
    pub id: RemoteId,
    /// File name (no path component)
    pub name: String,
    /// MIME type reported by the provider
    pub mime_type: String,
    /// Size in bytes (0 when the provider reports none)
    pub size_bytes: u64,
    /// Last modification instant on the provider side
    pub modified_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Returns true if the file name ends with `suffix`
    ///
    /// Matching is case-sensitive. An empty suffix matches every file.
    pub fn matches_suffix(&self, suffix: &str) -> bool {
        self.name.ends_with(suffix)
    }

    /// Modification instant truncated to whole milliseconds
    pub fn modified_at_millis(&self) -> i64 {
        self.modified_at.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> FileMetadata {
        FileMetadata {
            id: RemoteId::new("file1").unwrap(),
            name: name.to_string(),
            mime_type: "application/octet-stream".to_string(),
            size_bytes: 10,
            modified_at: "2024-05-01T10:00:00.123456Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_matches_suffix() {
        let m = meta("backup_2024.daylio");
        assert!(m.matches_suffix(".daylio"));
        assert!(m.matches_suffix(""));
        assert!(!m.matches_suffix(".csv"));
        assert!(!m.matches_suffix(".DAYLIO"));
    }

    #[test]
    fn test_modified_at_millis_truncates() {
        let m = meta("x");
        let expected: DateTime<Utc> = "2024-05-01T10:00:00.123Z".parse().unwrap();
        assert_eq!(m.modified_at_millis(), expected.timestamp_millis());
    }
}
