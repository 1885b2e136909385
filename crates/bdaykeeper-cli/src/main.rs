//! bdaykeeper CLI - Command-line interface for bdaykeeper
//!
//! Provides commands for:
//! - Running a one-shot cache sync
//! - Refreshing the remote configuration
//! - Showing the birthday countdown
//! - Managing admin overrides and stored credentials
//! - Inspecting the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    admin::AdminCommand, auth::AuthCommand, completions::CompletionsCommand,
    config::ConfigCommand, countdown::CountdownCommand, fetch_config::FetchConfigCommand,
    sync::SyncCommand, CliContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "bdaykeeper",
    version,
    about = "Keeps a Daylio export cached and counts down to the birthday"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Refresh the local cache from the cloud folder
    Sync(SyncCommand),
    /// Refresh the cached remote configuration
    FetchConfig(FetchConfigCommand),
    /// Show the notification instant and the time left
    Countdown(CountdownCommand),
    /// Manage local admin overrides
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Manage stored Google credentials
    #[command(subcommand)]
    Auth(AuthCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext::new(format, cli.config);

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::FetchConfig(cmd) => cmd.execute(&ctx).await,
        Commands::Countdown(cmd) => cmd.execute(&ctx).await,
        Commands::Admin(cmd) => cmd.execute(&ctx).await,
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    }
}
