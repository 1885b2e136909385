//! Config command - View and manage the bdaykeeper configuration file
//!
//! Provides the `bdaykeeper config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Prints the configuration file location

use std::path::PathBuf;

use anyhow::{Context, Result};
use bdaykeeper_core::config::Config;
use clap::Subcommand;
use tracing::info;

use super::CliContext;

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("target.folder_id", "Drive folder id (\"none\" to unset)"),
    ("target.file_name", "Name of the cached export file"),
    ("target.match_suffix", "Suffix candidate files must end with"),
    ("sync.check_interval_hours", "Hours between sync passes"),
    ("sync.cache_dir", "Directory holding the cached file"),
    ("sync.retry_base_secs", "First retry delay"),
    ("sync.retry_max_secs", "Longest retry delay"),
    ("sync.auth_failure_alert_threshold", "Auth failures before alerting"),
    ("drive.page_size", "Files per listing page (1-1000)"),
    ("drive.remote_config_file_name", "Remote configuration document name"),
    ("auth.client_id", "OAuth client id (\"none\" to unset)"),
    ("auth.account", "Keyring account name"),
    ("alarm.allow_exact", "true|false"),
    ("alarm.inexact_slack_secs", "Slack added to inexact alarms"),
    ("state.settings_path", "Settings store file"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.format", "text|json"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.check_interval_hours")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
        }
    }

    fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CliContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = &ctx.config_path;
        let mut config = ctx.load_config();

        info!(key, value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{key}': {e}"));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<36} - {help}"));
                }
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": messages,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{key}': {}", messages.join("; ")));
            }
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        std::fs::write(config_path, yaml).context("Failed to write configuration file")?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {key} = {value}"));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = &ctx.config_path;

        // Load explicitly so parse errors surface instead of falling back
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {e:#}")
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else if config_path.exists() {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info("Using default configuration. Run 'bdaykeeper config set <key> <value>' to create one.");
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");
        let errors = config.validate();

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }

    fn execute_path(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "config_path": ctx.config_path.display().to_string(),
                "exists": ctx.config_path.exists(),
            }));
        } else {
            println!("{}", ctx.config_path.display());
        }
        Ok(())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    fn optional(value: &str) -> Option<String> {
        if value.is_empty() || value == "none" {
            None
        } else {
            Some(value.to_string())
        }
    }

    match key {
        // --- target ---
        "target.folder_id" => config.target.folder_id = optional(value),
        "target.file_name" => config.target.file_name = value.to_string(),
        "target.match_suffix" => config.target.match_suffix = value.to_string(),

        // --- sync ---
        "sync.check_interval_hours" => {
            config.sync.check_interval_hours = value
                .parse::<u64>()
                .context("Expected a positive integer for sync.check_interval_hours")?;
        }
        "sync.cache_dir" => config.sync.cache_dir = PathBuf::from(value),
        "sync.retry_base_secs" => {
            config.sync.retry_base_secs =
                value.parse::<u64>().context("Expected a positive integer")?;
        }
        "sync.retry_max_secs" => {
            config.sync.retry_max_secs =
                value.parse::<u64>().context("Expected a positive integer")?;
        }
        "sync.auth_failure_alert_threshold" => {
            config.sync.auth_failure_alert_threshold =
                value.parse::<u32>().context("Expected a positive integer")?;
        }

        // --- drive ---
        "drive.page_size" => {
            config.drive.page_size = value.parse::<u32>().context("Expected a positive integer")?;
        }
        "drive.remote_config_file_name" => {
            config.drive.remote_config_file_name = value.to_string();
        }

        // --- auth ---
        "auth.client_id" => config.auth.client_id = optional(value),
        "auth.account" => config.auth.account = value.to_string(),

        // --- alarm ---
        "alarm.allow_exact" => {
            config.alarm.allow_exact = value.parse::<bool>().context("Expected true or false")?;
        }
        "alarm.inexact_slack_secs" => {
            config.alarm.inexact_slack_secs =
                value.parse::<u64>().context("Expected a positive integer")?;
        }

        // --- state ---
        "state.settings_path" => config.state.settings_path = PathBuf::from(value),

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => config.logging.format = value.to_string(),

        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }
    Ok(())
}
