//! Fetch-config command - Refresh the cached remote configuration
//!
//! Downloads the configuration document from the target folder (or the
//! folder given with `--folder`) and replaces the cached snapshot when the
//! document is newer. A malformed document leaves the cache untouched.

use std::sync::Arc;

use anyhow::{Context, Result};
use bdaykeeper_core::{
    domain::RemoteId,
    usecases::{FetchRemoteConfigUseCase, RemoteConfigOutcome},
};
use bdaykeeper_drive::provider::DriveRemoteStore;
use clap::Args;

use super::CliContext;

#[derive(Debug, Args)]
pub struct FetchConfigCommand {
    /// Folder holding the configuration document (defaults to the target folder)
    #[arg(long)]
    pub folder: Option<String>,
}

impl FetchConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let (source, settings) = ctx.config_source()?;
        let config = source.config();

        let folder = match &self.folder {
            Some(raw) => Some(RemoteId::new(raw.as_str()).context("Invalid --folder")?),
            None => source.folder_id()?,
        };
        let Some(folder) = folder else {
            formatter.error("No folder configured. Set target.folder_id or pass --folder.");
            return Ok(());
        };

        let use_case = FetchRemoteConfigUseCase::new(
            Arc::new(DriveRemoteStore::from_config(config)),
            settings,
            config.drive.remote_config_file_name.clone(),
        );

        match use_case.try_fetch(&folder).await {
            Ok(RemoteConfigOutcome::Applied(doc)) => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "success": true,
                        "applied": true,
                        "document": doc,
                    }));
                } else {
                    formatter.success(&format!("Applied remote configuration v{}", doc.version));
                    let target = doc.target();
                    formatter.field(
                        "Birthday",
                        &format!(
                            "{:04}-{:02}-{:02} {:02}:{:02}",
                            target.year, target.month, target.day, target.hour, target.minute
                        ),
                    );
                    formatter.field("File name", &doc.daylio_file_name);
                    if let Some(at) = doc.last_updated_at() {
                        formatter.field("Last updated", &at.to_rfc3339());
                    }
                }
            }
            Ok(RemoteConfigOutcome::AlreadyCurrent) => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "success": true,
                        "applied": false,
                    }));
                } else {
                    formatter.success("Cached remote configuration is already current");
                }
            }
            Err(e) => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "success": false,
                        "error": format!("{e:#}"),
                    }));
                } else {
                    formatter.error(&format!("{e:#}"));
                    formatter.info("The cached configuration was left unchanged.");
                }
            }
        }
        Ok(())
    }
}
