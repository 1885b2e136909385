//! Admin commands - Local overrides of the target settings
//!
//! Overrides live in the settings store and win over both the cached remote
//! configuration and the YAML file, but only while admin mode is enabled.
//! Each value is optional: an unset override falls through to the next
//! layer.

use anyhow::{bail, Context, Result};
use bdaykeeper_core::{
    domain::{BirthdayTarget, RemoteId},
    ports::{keys, IConfigSource, ISettingsStore},
};
use chrono::{Datelike, NaiveDateTime, Timelike};
use clap::Subcommand;
use tracing::info;

use super::CliContext;

const ADMIN_KEYS: &[&str] = &[
    keys::ADMIN_ENABLED,
    keys::ADMIN_BIRTHDAY_YEAR,
    keys::ADMIN_BIRTHDAY_MONTH,
    keys::ADMIN_BIRTHDAY_DAY,
    keys::ADMIN_BIRTHDAY_HOUR,
    keys::ADMIN_BIRTHDAY_MINUTE,
    keys::ADMIN_FOLDER_ID,
    keys::ADMIN_FILE_NAME,
];

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Show stored overrides and the effective target
    Show,
    /// Apply stored overrides
    Enable,
    /// Ignore stored overrides without deleting them
    Disable,
    /// Store one or more overrides
    Set {
        /// Birthday in Europe/Warsaw time, e.g. "2027-01-12 08:00"
        #[arg(long)]
        birthday: Option<String>,
        /// Drive folder id
        #[arg(long)]
        folder_id: Option<String>,
        /// Name of the cached export file
        #[arg(long)]
        file_name: Option<String>,
    },
    /// Delete every override and disable admin mode
    Clear,
}

impl AdminCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AdminCommand::Show => self.execute_show(ctx),
            AdminCommand::Enable => self.execute_toggle(ctx, true),
            AdminCommand::Disable => self.execute_toggle(ctx, false),
            AdminCommand::Set {
                birthday,
                folder_id,
                file_name,
            } => self.execute_set(ctx, birthday.as_deref(), folder_id.as_deref(), file_name.as_deref()),
            AdminCommand::Clear => self.execute_clear(ctx),
        }
    }

    fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let (source, settings) = ctx.config_source()?;

        let mut stored = serde_json::Map::new();
        for key in ADMIN_KEYS {
            if let Some(value) = settings.get(key)? {
                stored.insert((*key).to_string(), serde_json::Value::String(value));
            }
        }
        let effective = source.target_settings()?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "overrides": stored,
                "effective": {
                    "folder_id": effective.folder_id.as_ref().map(|f| f.as_str().to_string()),
                    "file_name": effective.file_name,
                    "fire_at": effective.fire_at.to_rfc3339(),
                },
            }));
            return Ok(());
        }

        let enabled = settings.get_flag(keys::ADMIN_ENABLED)?;
        formatter.success(&format!(
            "Admin mode {}",
            if enabled { "enabled" } else { "disabled" }
        ));
        if stored.is_empty() {
            formatter.info("No overrides stored");
        }
        for (key, value) in &stored {
            formatter.field(key, value.as_str().unwrap_or_default());
        }
        formatter.info("");
        formatter.info("Effective target:");
        formatter.field(
            "Folder",
            effective
                .folder_id
                .as_ref()
                .map(RemoteId::as_str)
                .unwrap_or("(not configured)"),
        );
        formatter.field("File name", &effective.file_name);
        formatter.field("Fires at (UTC)", &effective.fire_at.to_rfc3339());
        Ok(())
    }

    fn execute_toggle(&self, ctx: &CliContext, enabled: bool) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let settings = ctx.open_settings(&config)?;

        settings.set(keys::ADMIN_ENABLED, enabled.to_string())?;
        info!(enabled, "Admin mode toggled");

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({"success": true, "admin_enabled": enabled}));
        } else {
            formatter.success(if enabled {
                "Admin overrides enabled"
            } else {
                "Admin overrides disabled"
            });
        }
        Ok(())
    }

    fn execute_set(
        &self,
        ctx: &CliContext,
        birthday: Option<&str>,
        folder_id: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<()> {
        let formatter = ctx.formatter();
        let entries = override_entries(birthday, folder_id, file_name)?;
        if entries.is_empty() {
            bail!("Nothing to set. Pass --birthday, --folder-id or --file-name.");
        }

        let config = ctx.load_config();
        let settings = ctx.open_settings(&config)?;
        let pairs: Vec<(&str, String)> = entries.iter().map(|(k, v)| (*k, v.clone())).collect();
        settings.set_many(&pairs)?;

        let enabled = settings.get_flag(keys::ADMIN_ENABLED)?;
        if ctx.is_json() {
            let stored: serde_json::Map<_, _> = entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), serde_json::Value::String(v.clone())))
                .collect();
            formatter.print_json(&serde_json::json!({
                "success": true,
                "stored": stored,
                "admin_enabled": enabled,
            }));
        } else {
            formatter.success(&format!("Stored {} override(s)", entries.len()));
            if !enabled {
                formatter.warn("Admin mode is disabled; run 'bdaykeeper admin enable' to apply");
            }
        }
        Ok(())
    }

    fn execute_clear(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let settings = ctx.open_settings(&config)?;

        settings.remove_many(ADMIN_KEYS)?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({"success": true}));
        } else {
            formatter.success("Admin overrides cleared");
        }
        Ok(())
    }
}

/// Validates the given overrides and turns them into settings entries
fn override_entries(
    birthday: Option<&str>,
    folder_id: Option<&str>,
    file_name: Option<&str>,
) -> Result<Vec<(&'static str, String)>> {
    let mut entries = Vec::new();

    if let Some(raw) = birthday {
        let target = parse_birthday(raw)?;
        entries.extend([
            (keys::ADMIN_BIRTHDAY_YEAR, target.year.to_string()),
            (keys::ADMIN_BIRTHDAY_MONTH, target.month.to_string()),
            (keys::ADMIN_BIRTHDAY_DAY, target.day.to_string()),
            (keys::ADMIN_BIRTHDAY_HOUR, target.hour.to_string()),
            (keys::ADMIN_BIRTHDAY_MINUTE, target.minute.to_string()),
        ]);
    }
    if let Some(raw) = folder_id {
        let id = RemoteId::new(raw).context("Invalid --folder-id")?;
        entries.push((keys::ADMIN_FOLDER_ID, id.as_str().to_string()));
    }
    if let Some(raw) = file_name {
        let name = raw.trim();
        if name.is_empty() || name.contains('/') {
            bail!("Invalid --file-name {raw:?}: must be a bare, non-empty file name");
        }
        entries.push((keys::ADMIN_FILE_NAME, name.to_string()));
    }
    Ok(entries)
}

/// Parses `YYYY-MM-DD HH:MM` (or with a `T` separator)
fn parse_birthday(raw: &str) -> Result<BirthdayTarget> {
    let normalized = raw.trim().replacen('T', " ", 1);
    let naive = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M")
        .with_context(|| format!("Invalid --birthday {raw:?}, expected YYYY-MM-DD HH:MM"))?;

    let target = BirthdayTarget {
        year: naive.year(),
        month: naive.month(),
        day: naive.day(),
        hour: naive.hour(),
        minute: naive.minute(),
    };
    target.validate()?;
    Ok(target)
}
