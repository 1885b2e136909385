//! OAuth2 credentials for the Google Drive API
//!
//! bdaykeeper never runs an interactive login. The user imports a refresh
//! token once (`bdaykeeper auth import`); from then on access tokens are
//! refreshed with the `refresh_token` grant and written back to the keyring.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client credentials and token endpoint
//! - [`KeyringTokenStorage`] - Secure token storage using the system keyring
//! - [`RefreshTokenFlow`] - Refresh-token grant using the `oauth2` crate
//! - [`KeyringCredentialSource`] - [`ICredentialSource`] that refreshes on demand
//! - [`StaticCredentialSource`] - Fixed access token (environment, tests)
//! - [`UnavailableCredentialSource`] - Stand-in that reports missing configuration

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bdaykeeper_core::{
    config::AuthConfig,
    ports::{ICredentialSource, Tokens},
};
use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken,
    TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "bdaykeeper";

/// Access tokens expiring within this window are refreshed before use
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Environment variable holding a ready-to-use access token
pub const ACCESS_TOKEN_ENV: &str = "BDAYKEEPER_ACCESS_TOKEN";

// ============================================================================
// OAuth2Config
// ============================================================================

/// Client settings for the refresh-token grant
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth client ID from the Google Cloud console
    pub client_id: String,
    /// Client secret, for client types that are issued one
    pub client_secret: Option<String>,
    /// Token endpoint
    pub token_url: String,
}

impl OAuth2Config {
    /// Creates a config for `client_id` against Google's token endpoint
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            token_url: TOKEN_URL.to_string(),
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Builds the config from the `auth` section; fails without a client id
    pub fn from_auth_config(auth: &AuthConfig) -> Result<Self> {
        let client_id = auth
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .context("auth.client_id is not configured")?;

        let mut config = Self::new(client_id).with_token_url(auth.token_url.clone());
        if let Some(secret) = auth.client_secret.as_deref() {
            config = config.with_client_secret(secret);
        }
        Ok(config)
    }
}

// ============================================================================
// KeyringTokenStorage
// ============================================================================

/// Stores and retrieves OAuth tokens from the system keyring
///
/// Tokens are serialized as JSON under the service name "bdaykeeper" with
/// the configured account name as the username.
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    /// Stores tokens in the system keyring for the given account
    pub fn store(account: &str, tokens: &Tokens) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;

        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;

        entry
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;

        debug!(account, "Stored tokens in keyring");
        Ok(())
    }

    /// Loads tokens from the system keyring for the given account
    ///
    /// # Returns
    /// `Some(Tokens)` if found and valid, `None` if not found
    pub fn load(account: &str) -> Result<Option<Tokens>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let tokens: Tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!(account, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account, "No tokens found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes tokens from the system keyring for the given account
    pub fn clear(account: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!(account, "Cleared tokens from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account, "No tokens to clear");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// RefreshTokenFlow
// ============================================================================

/// Refresh-token grant against the configured token endpoint
pub struct RefreshTokenFlow {
    client: BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http_client: reqwest::Client,
}

impl RefreshTokenFlow {
    /// Creates a flow from the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?);
        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        Ok(Self {
            client,
            http_client: reqwest::Client::new(),
        })
    }

    /// Exchanges a refresh token for a fresh access token
    ///
    /// Google usually omits the refresh token from the response; the old one
    /// is carried over in that case.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .context("Failed to refresh token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
        };

        info!(expires_at = %tokens.expires_at, "Successfully refreshed access token");
        Ok(tokens)
    }
}

// ============================================================================
// Credential sources
// ============================================================================

/// Credential source backed by the keyring and the refresh-token grant
///
/// Tokens are cached in memory after the first read. An access token that
/// expires within five minutes is refreshed before it is handed out.
pub struct KeyringCredentialSource {
    account: String,
    flow: RefreshTokenFlow,
    cached: Mutex<Option<Tokens>>,
    persist: bool,
}

impl KeyringCredentialSource {
    /// Creates a source reading and writing the keyring entry of `account`
    pub fn new(account: impl Into<String>, flow: RefreshTokenFlow) -> Self {
        Self {
            account: account.into(),
            flow,
            cached: Mutex::new(None),
            persist: true,
        }
    }

    /// Creates a source seeded with `tokens` that never touches the keyring
    pub fn in_memory(tokens: Tokens, flow: RefreshTokenFlow) -> Self {
        Self {
            account: String::new(),
            flow,
            cached: Mutex::new(Some(tokens)),
            persist: false,
        }
    }
}

#[async_trait]
impl ICredentialSource for KeyringCredentialSource {
    async fn tokens(&self) -> Result<Tokens> {
        let mut cached = self.cached.lock().await;

        if cached.is_none() && self.persist {
            *cached = KeyringTokenStorage::load(&self.account)?;
        }
        let Some(current) = cached.as_ref() else {
            bail!(
                "No stored credentials for account '{}'; run `bdaykeeper auth import`",
                self.account
            );
        };

        if !current.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES)) {
            return Ok(current.clone());
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            bail!("Access token expired and no refresh token is stored");
        };

        let fresh = self.flow.refresh(&refresh_token).await?;
        if self.persist {
            if let Err(e) = KeyringTokenStorage::store(&self.account, &fresh) {
                warn!(error = %format!("{e:#}"), "Refreshed tokens could not be written back");
            }
        }
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}

/// Credential source handing out one fixed access token
pub struct StaticCredentialSource {
    tokens: Tokens,
}

impl StaticCredentialSource {
    pub fn new(tokens: Tokens) -> Self {
        Self { tokens }
    }

    /// Wraps a bare access token that is treated as never expiring
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self::new(Tokens {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: DateTime::<Utc>::MAX_UTC,
        })
    }
}

#[async_trait]
impl ICredentialSource for StaticCredentialSource {
    async fn tokens(&self) -> Result<Tokens> {
        Ok(self.tokens.clone())
    }
}

/// Credential source that always fails with the reason it could not be built
///
/// Keeps a misconfigured host running: every sync pass reports an
/// authentication failure instead of the process refusing to start.
pub struct UnavailableCredentialSource {
    reason: String,
}

impl UnavailableCredentialSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ICredentialSource for UnavailableCredentialSource {
    async fn tokens(&self) -> Result<Tokens> {
        bail!("Credentials unavailable: {}", self.reason)
    }
}

/// Picks the credential source for the given `auth` section
///
/// A token in [`ACCESS_TOKEN_ENV`] wins; otherwise the keyring entry of
/// `auth.account` is used, refreshed through `auth.client_id`. When neither
/// is usable the returned source fails on every call.
pub fn credential_source_from_config(auth: &AuthConfig) -> Arc<dyn ICredentialSource> {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Arc::new(StaticCredentialSource::from_access_token(token));
        }
    }

    let flow = OAuth2Config::from_auth_config(auth).and_then(|config| RefreshTokenFlow::new(&config));
    match flow {
        Ok(flow) => Arc::new(KeyringCredentialSource::new(auth.account.clone(), flow)),
        Err(e) => {
            let reason = format!("{e:#}");
            warn!(reason = %reason, "No usable credential source configured");
            Arc::new(UnavailableCredentialSource::new(reason))
        }
    }
}
