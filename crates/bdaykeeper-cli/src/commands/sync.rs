//! Sync command - Refresh the local cache once
//!
//! Provides the `bdaykeeper sync` CLI command which:
//! 1. Loads configuration and the settings store
//! 2. Builds the Drive remote store from the configured credentials
//! 3. Runs one SyncEngine pass (or only the decision with `--dry-run`)
//! 4. Displays the decision and what was written

use std::sync::Arc;

use anyhow::Result;
use bdaykeeper_core::domain::SyncDecision;
use bdaykeeper_drive::provider::DriveRemoteStore;
use bdaykeeper_sync::engine::{PassOutcome, SyncEngine, SyncReport};
use clap::Args;
use tracing::info;

use super::CliContext;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would be done without downloading
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();

        let (source, _settings) = ctx.config_source()?;
        let config = source.config();
        let remote_store = Arc::new(DriveRemoteStore::from_config(config));
        let engine = SyncEngine::new(remote_store, source.clone(), config.sync.cache_dir.clone());

        if self.dry_run {
            info!("Dry run: deciding without downloading");
            match engine.plan().await {
                Ok(decision) => {
                    if ctx.is_json() {
                        formatter.print_json(&serde_json::json!({
                            "success": true,
                            "dry_run": true,
                            "decision": decision_json(&decision),
                        }));
                    } else {
                        formatter.success(&format!("Dry run: {}", describe(&decision)));
                    }
                }
                Err(e) => formatter.error(&e.to_string()),
            }
            return Ok(());
        }

        match PassOutcome::from_result(engine.sync().await) {
            PassOutcome::Success(report) => print_report(ctx, &report),
            PassOutcome::Retry(e) => {
                if e.is_auth() {
                    formatter.error(&format!("{e}"));
                    formatter.info("Run 'bdaykeeper auth import' or set BDAYKEEPER_ACCESS_TOKEN.");
                } else {
                    formatter.error(&format!("{e} (transient, try again later)"));
                }
            }
            PassOutcome::Failure(e) => formatter.error(&e.to_string()),
        }
        Ok(())
    }
}

fn print_report(ctx: &CliContext, report: &SyncReport) {
    let formatter = ctx.formatter();
    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "decision": decision_json(&report.decision),
            "bytes_written": report.bytes_written,
            "cache_path": report.cache_path.display().to_string(),
            "duration_ms": report.duration_ms,
        }));
        return;
    }

    formatter.success(&describe(&report.decision));
    formatter.field("Cache", &report.cache_path.display().to_string());
    if report.bytes_written > 0 {
        formatter.field("Bytes written", &report.bytes_written.to_string());
    }
    formatter.field("Duration", &format!("{} ms", report.duration_ms));
}

/// One-line summary of a decision
fn describe(decision: &SyncDecision) -> String {
    match decision {
        SyncDecision::NoCandidates => "No matching file in the folder".to_string(),
        SyncDecision::UpToDate => "Cache is up to date".to_string(),
        SyncDecision::Fetch(file) => format!(
            "Fetched {} (modified {})",
            file.name,
            file.modified_at.to_rfc3339()
        ),
    }
}

fn decision_json(decision: &SyncDecision) -> serde_json::Value {
    match decision {
        SyncDecision::Fetch(file) => serde_json::json!({
            "kind": decision.label(),
            "candidate": {
                "id": file.id.as_str(),
                "name": file.name,
                "size_bytes": file.size_bytes,
                "modified_at": file.modified_at.to_rfc3339(),
            },
        }),
        _ => serde_json::json!({ "kind": decision.label() }),
    }
}

#[cfg(test)]
mod tests {
    use bdaykeeper_core::domain::{FileMetadata, RemoteId};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn fetch() -> SyncDecision {
        SyncDecision::Fetch(FileMetadata {
            id: RemoteId::new("f1").unwrap(),
            name: "backup.daylio".to_string(),
            mime_type: "application/octet-stream".to_string(),
            size_bytes: 42,
            modified_at: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_decision_json_includes_candidate() {
        let json = decision_json(&fetch());
        assert_eq!(json["kind"], "fetch");
        assert_eq!(json["candidate"]["id"], "f1");
        assert_eq!(json["candidate"]["size_bytes"], 42);
    }

    #[test]
    fn test_decision_json_without_candidate() {
        assert_eq!(
            decision_json(&SyncDecision::UpToDate),
            serde_json::json!({"kind": "up_to_date"})
        );
    }

    #[test]
    fn test_describe_fetch_names_file() {
        assert!(describe(&fetch()).contains("backup.daylio"));
        assert_eq!(describe(&SyncDecision::NoCandidates), "No matching file in the folder");
    }
}
