//! bdaykeeper Daemon - Background sync and notification service
//!
//! This binary runs as a user service and handles:
//! - Periodic refresh of the cached Daylio export from Google Drive
//! - The birthday notification alarm, re-armed on every start
//! - A best-effort refresh of the remote configuration at start
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! `main` loads the YAML configuration, installs logging, builds the
//! adapters and hands them to [`service::DaemonService`]. The service loop
//! is controlled by a `CancellationToken` that is triggered on receipt of
//! SIGTERM or SIGINT.

mod service;

use std::sync::Arc;

use anyhow::{Context, Result};
use bdaykeeper_alarm::{AlarmRegistry, AlarmScheduler, TokioAlarmBackend};
use bdaykeeper_core::config::{Config, LoggingConfig};
use bdaykeeper_drive::provider::DriveRemoteStore;
use bdaykeeper_sync::settings::JsonFileSettingsStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::service::{DaemonService, NotificationReceiver};

/// Environment variable overriding the configuration file location
const CONFIG_ENV: &str = "BDAYKEEPER_CONFIG";

// ============================================================================
// Logging
// ============================================================================

/// Installs the global subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Composition
// ============================================================================

fn load_config() -> Result<Config> {
    let path = std::env::var_os(CONFIG_ENV)
        .map(Into::into)
        .unwrap_or_else(Config::default_path);

    let config = if path.exists() {
        Config::load(&path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        Config::default()
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("Invalid configuration {}: {joined}", path.display());
    }
    Ok(config)
}

fn build_service(config: Config) -> Result<DaemonService> {
    let settings = Arc::new(
        JsonFileSettingsStore::open(&config.state.settings_path)
            .context("Failed to open settings store")?,
    );
    let remote_store = Arc::new(DriveRemoteStore::from_config(&config));

    let registry = AlarmRegistry::new();
    let receiver = registry.tracking(Arc::new(NotificationReceiver));
    let backend = TokioAlarmBackend::from_config(&config.alarm, receiver)
        .context("Failed to start alarm backend")?;
    let scheduler = AlarmScheduler::new(Arc::new(backend), registry);

    Ok(DaemonService::new(config, remote_store, settings, scheduler))
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        cache_dir = %config.sync.cache_dir.display(),
        "bdaykeeper daemon starting (bdaykeeperd)"
    );

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = build_service(config)?;
    let stats = service.run(shutdown_token).await;

    info!(
        passes = stats.passes,
        failures = stats.failures,
        notification = ?service.notification_state(),
        "bdaykeeper daemon shut down gracefully"
    );
    Ok(())
}
