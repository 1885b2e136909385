//! Settings store port
//!
//! Flat key/value persistence for admin overrides, the cached remote
//! configuration and host bookkeeping. Values are strings; typed accessors
//! live on the trait as provided methods.

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;

/// Errors raised by a settings store
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is corrupt: {0}")]
    Corrupt(String),
}

/// Well-known setting keys
pub mod keys {
    pub const ADMIN_ENABLED: &str = "admin_enabled";
    pub const ADMIN_BIRTHDAY_YEAR: &str = "admin_birthday_year";
    pub const ADMIN_BIRTHDAY_MONTH: &str = "admin_birthday_month";
    pub const ADMIN_BIRTHDAY_DAY: &str = "admin_birthday_day";
    pub const ADMIN_BIRTHDAY_HOUR: &str = "admin_birthday_hour";
    pub const ADMIN_BIRTHDAY_MINUTE: &str = "admin_birthday_minute";
    pub const ADMIN_FOLDER_ID: &str = "admin_folder_id";
    pub const ADMIN_FILE_NAME: &str = "admin_file_name";

    pub const REMOTE_VERSION: &str = "remote_version";
    pub const REMOTE_BIRTHDAY_YEAR: &str = "remote_birthday_year";
    pub const REMOTE_BIRTHDAY_MONTH: &str = "remote_birthday_month";
    pub const REMOTE_BIRTHDAY_DAY: &str = "remote_birthday_day";
    pub const REMOTE_BIRTHDAY_HOUR: &str = "remote_birthday_hour";
    pub const REMOTE_BIRTHDAY_MINUTE: &str = "remote_birthday_minute";
    pub const REMOTE_FILE_NAME: &str = "remote_file_name";
    pub const REMOTE_LAST_UPDATED: &str = "remote_last_updated";

    pub const NOTIFICATION_SCHEDULED_AT: &str = "notification_scheduled_at";
}

/// Port trait for flat key/value settings
///
/// Implementations may block on file I/O. Async callers on hot paths run
/// writes through `tokio::task::spawn_blocking`.
pub trait ISettingsStore: Send + Sync {
    /// Reads a value
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// Writes several values in one durable update
    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), SettingsError>;

    /// Removes several keys in one durable update
    fn remove_many(&self, keys: &[&str]) -> Result<(), SettingsError>;

    /// Writes a single value
    fn set(&self, key: &str, value: String) -> Result<(), SettingsError> {
        self.set_many(&[(key, value)])
    }

    /// Reads an integer value; unparsable values read as absent
    fn get_i64(&self, key: &str) -> Result<Option<i64>, SettingsError> {
        Ok(self.get(key)?.and_then(|v| v.trim().parse().ok()))
    }

    /// Reads a boolean flag (`true`/`false`), defaulting to false
    fn get_flag(&self, key: &str) -> Result<bool, SettingsError> {
        Ok(matches!(self.get(key)?.as_deref(), Some("true")))
    }
}

/// Volatile settings store
///
/// Used for tests and for one-shot CLI runs that must not persist anything.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, SettingsError> {
        self.values
            .lock()
            .map_err(|_| SettingsError::Corrupt("settings lock poisoned".to_string()))
    }
}

impl ISettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), SettingsError> {
        let mut values = self.lock()?;
        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), SettingsError> {
        let mut values = self.lock()?;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
