//! Layered configuration source
//!
//! Resolves each target field from the first layer that provides it:
//!
//! 1. admin overrides (only while `admin_enabled` is set)
//! 2. the cached remote configuration snapshot
//! 3. the bundled YAML configuration
//!
//! The folder id has no remote layer: the document lives inside the folder.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    config::Config,
    domain::{BirthdayTarget, RemoteId},
    ports::{keys, IConfigSource, ISettingsStore, SyncTarget, TargetSettings},
};

/// [`IConfigSource`] backed by the YAML config and the settings store
pub struct LayeredConfigSource {
    config: Config,
    settings: Arc<dyn ISettingsStore>,
}

impl LayeredConfigSource {
    pub fn new(config: Config, settings: Arc<dyn ISettingsStore>) -> Self {
        Self { config, settings }
    }

    /// The bundled configuration this source falls back to
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves the birthday components field by field
    pub fn birthday(&self) -> Result<BirthdayTarget> {
        let admin = self.admin_enabled()?;
        let base = &self.config.target.birthday;

        Ok(BirthdayTarget {
            year: self.component(
                admin,
                keys::ADMIN_BIRTHDAY_YEAR,
                keys::REMOTE_BIRTHDAY_YEAR,
                base.year,
            )?,
            month: self.component(
                admin,
                keys::ADMIN_BIRTHDAY_MONTH,
                keys::REMOTE_BIRTHDAY_MONTH,
                base.month,
            )?,
            day: self.component(
                admin,
                keys::ADMIN_BIRTHDAY_DAY,
                keys::REMOTE_BIRTHDAY_DAY,
                base.day,
            )?,
            hour: self.component(
                admin,
                keys::ADMIN_BIRTHDAY_HOUR,
                keys::REMOTE_BIRTHDAY_HOUR,
                base.hour,
            )?,
            minute: self.component(
                admin,
                keys::ADMIN_BIRTHDAY_MINUTE,
                keys::REMOTE_BIRTHDAY_MINUTE,
                base.minute,
            )?,
        })
    }

    /// Resolves the target folder, `None` when no layer configures one
    pub fn folder_id(&self) -> Result<Option<RemoteId>> {
        let admin_value = if self.admin_enabled()? {
            self.settings.get(keys::ADMIN_FOLDER_ID)?
        } else {
            None
        };

        match admin_value.or_else(|| self.config.target.folder_id.clone()) {
            Some(raw) if !raw.trim().is_empty() => {
                let id = RemoteId::new(raw).context("Configured folder id is invalid")?;
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    /// Resolves the local cache file name
    pub fn file_name(&self) -> Result<String> {
        if self.admin_enabled()? {
            if let Some(name) = non_empty(self.settings.get(keys::ADMIN_FILE_NAME)?) {
                return Ok(name);
            }
        }
        if let Some(name) = non_empty(self.settings.get(keys::REMOTE_FILE_NAME)?) {
            return Ok(name);
        }
        Ok(self.config.target.file_name.clone())
    }

    fn admin_enabled(&self) -> Result<bool> {
        Ok(self.settings.get_flag(keys::ADMIN_ENABLED)?)
    }

    fn component<T>(&self, admin: bool, admin_key: &str, remote_key: &str, fallback: T) -> Result<T>
    where
        T: TryFrom<i64>,
    {
        if admin {
            if let Some(v) = self.settings.get_i64(admin_key)? {
                if let Ok(v) = T::try_from(v) {
                    return Ok(v);
                }
            }
        }
        if let Some(v) = self.settings.get_i64(remote_key)? {
            if let Ok(v) = T::try_from(v) {
                return Ok(v);
            }
        }
        Ok(fallback)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl IConfigSource for LayeredConfigSource {
    fn sync_target(&self) -> Result<SyncTarget> {
        Ok(SyncTarget {
            folder_id: self.folder_id()?,
            file_name: self.file_name()?,
            match_suffix: self.config.target.match_suffix.clone(),
            check_interval: self.config.check_interval(),
        })
    }

    fn target_settings(&self) -> Result<TargetSettings> {
        let birthday = self.birthday()?;
        let fire_at = birthday
            .fire_instant()
            .with_context(|| format!("Cannot compose notification instant from {birthday:?}"))?;

        Ok(TargetSettings::new(self.sync_target()?, fire_at))
    }
}
