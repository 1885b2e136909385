//! Config source port
//!
//! Read-only view of the values the sync pass and the alarm need. The
//! composition root decides which layers (bundled defaults, admin settings,
//! cached remote config) feed it.
//!
//! The sync pass only asks for [`SyncTarget`], so a birthday that does not
//! compose into a real instant never stops the cache from refreshing.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::newtypes::RemoteId;

/// What a sync pass reads and where it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    /// Folder holding the export files (None when unconfigured)
    pub folder_id: Option<RemoteId>,
    /// Local name of the cached export file
    pub file_name: String,
    /// Suffix a remote file name must end with to be a candidate
    pub match_suffix: String,
    /// Interval between periodic sync passes
    pub check_interval: Duration,
}

/// Resolved sync and notification settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSettings {
    /// Folder holding the export files (None when unconfigured)
    pub folder_id: Option<RemoteId>,
    /// Local name of the cached export file
    pub file_name: String,
    /// Suffix a remote file name must end with to be a candidate
    pub match_suffix: String,
    /// Absolute notification instant
    pub fire_at: DateTime<Utc>,
    /// Interval between periodic sync passes
    pub check_interval: Duration,
}

impl TargetSettings {
    /// Combines a sync target with a notification instant
    pub fn new(target: SyncTarget, fire_at: DateTime<Utc>) -> Self {
        Self {
            folder_id: target.folder_id,
            file_name: target.file_name,
            match_suffix: target.match_suffix,
            fire_at,
            check_interval: target.check_interval,
        }
    }
}

/// Port trait for reading the current target settings
pub trait IConfigSource: Send + Sync {
    /// Resolves only what a sync pass needs
    fn sync_target(&self) -> anyhow::Result<SyncTarget>;

    /// Resolves the sync target and the notification instant
    fn target_settings(&self) -> anyhow::Result<TargetSettings>;
}
