//! Auth commands - Manage the stored Google credentials
//!
//! Provides the `bdaykeeper auth` CLI subcommands which:
//! 1. `import` - Exchanges a refresh token once to prove it works, then stores
//!    the resulting tokens in the system keyring.
//! 2. `logout` - Clears tokens from the keyring.
//! 3. `status` - Shows which credential source the daemon will use.

use anyhow::{Context, Result};
use bdaykeeper_drive::auth::{
    KeyringTokenStorage, OAuth2Config, RefreshTokenFlow, ACCESS_TOKEN_ENV,
};
use clap::Subcommand;
use tracing::info;

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store a Google refresh token in the system keyring
    Import {
        /// Refresh token issued for the configured client id
        #[arg(long)]
        refresh_token: String,
        /// Keyring account name (defaults to auth.account)
        #[arg(long)]
        account: Option<String>,
    },
    /// Remove stored credentials
    Logout {
        /// Keyring account name (defaults to auth.account)
        #[arg(long)]
        account: Option<String>,
    },
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AuthCommand::Import {
                refresh_token,
                account,
            } => self.execute_import(ctx, refresh_token, account.as_deref()).await,
            AuthCommand::Logout { account } => self.execute_logout(ctx, account.as_deref()),
            AuthCommand::Status => self.execute_status(ctx),
        }
    }

    /// 1. Build the refresh-token grant from the `auth` section
    /// 2. Exchange the token once
    /// 3. Store the fresh tokens under the account name
    async fn execute_import(
        &self,
        ctx: &CliContext,
        refresh_token: &str,
        account: Option<&str>,
    ) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let account = account.unwrap_or(&config.auth.account);

        let oauth = OAuth2Config::from_auth_config(&config.auth)
            .context("Set auth.client_id in the configuration before importing a token")?;
        let flow = RefreshTokenFlow::new(&oauth)?;

        info!(account, "Verifying refresh token");
        let tokens = flow
            .refresh(refresh_token.trim())
            .await
            .context("The token endpoint rejected the refresh token")?;

        KeyringTokenStorage::store(account, &tokens)?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "account": account,
                "expires_at": tokens.expires_at.to_rfc3339(),
            }));
        } else {
            formatter.success(&format!("Stored credentials for '{account}'"));
            formatter.field("Access token expires", &tokens.expires_at.to_rfc3339());
        }
        Ok(())
    }

    fn execute_logout(&self, ctx: &CliContext, account: Option<&str>) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let account = account.unwrap_or(&config.auth.account);

        KeyringTokenStorage::clear(account)?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({"success": true, "account": account}));
        } else {
            formatter.success(&format!("Removed stored credentials for '{account}'"));
        }
        Ok(())
    }

    fn execute_status(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let account = config.auth.account.as_str();

        let env_token = std::env::var(ACCESS_TOKEN_ENV)
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        let stored = KeyringTokenStorage::load(account)?;
        let client_configured = OAuth2Config::from_auth_config(&config.auth).is_ok();

        let source = if env_token {
            "environment"
        } else if stored.is_some() && client_configured {
            "keyring"
        } else {
            "none"
        };

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "source": source,
                "account": account,
                "client_id_configured": client_configured,
                "stored": stored.as_ref().map(|t| serde_json::json!({
                    "expires_at": t.expires_at.to_rfc3339(),
                    "expired": t.is_expired(),
                    "has_refresh_token": t.refresh_token.is_some(),
                })),
            }));
            return Ok(());
        }

        match source {
            "environment" => formatter.success(&format!("Using access token from {ACCESS_TOKEN_ENV}")),
            "keyring" => formatter.success(&format!("Using keyring credentials for '{account}'")),
            _ => formatter.warn("No usable credentials; the daemon cannot reach Google Drive"),
        }
        formatter.field("Client id configured", if client_configured { "yes" } else { "no" });
        match &stored {
            Some(tokens) => {
                formatter.field("Stored token expires", &tokens.expires_at.to_rfc3339());
                formatter.field(
                    "Refresh token",
                    if tokens.refresh_token.is_some() { "present" } else { "missing" },
                );
            }
            None => formatter.field("Stored token", "none"),
        }
        Ok(())
    }
}
