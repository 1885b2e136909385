//! CLI subcommands
//!
//! Every command receives a [`CliContext`] carrying the output format and
//! the configuration file location, and builds the adapters it needs.

pub mod admin;
pub mod auth;
pub mod completions;
pub mod config;
pub mod countdown;
pub mod fetch_config;
pub mod sync;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use bdaykeeper_core::{config::Config, usecases::LayeredConfigSource};
use bdaykeeper_sync::settings::JsonFileSettingsStore;
use tracing::debug;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct CliContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
}

impl CliContext {
    pub fn new(format: OutputFormat, config_path: Option<PathBuf>) -> Self {
        Self {
            format,
            config_path: config_path.unwrap_or_else(Config::default_path),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Loads the configuration file, falling back to defaults
    pub fn load_config(&self) -> Config {
        debug!(config_path = %self.config_path.display(), "Loading configuration");
        Config::load_or_default(&self.config_path)
    }

    /// Opens the settings store named by the configuration
    pub fn open_settings(&self, config: &Config) -> Result<Arc<JsonFileSettingsStore>> {
        let store = JsonFileSettingsStore::open(&config.state.settings_path).with_context(|| {
            format!(
                "Failed to open settings store {}",
                config.state.settings_path.display()
            )
        })?;
        Ok(Arc::new(store))
    }

    /// Loads the configuration and layers the settings store over it
    pub fn config_source(&self) -> Result<(Arc<LayeredConfigSource>, Arc<JsonFileSettingsStore>)> {
        let config = self.load_config();
        let settings = self.open_settings(&config)?;
        let source = Arc::new(LayeredConfigSource::new(config, settings.clone()));
        Ok((source, settings))
    }
}
