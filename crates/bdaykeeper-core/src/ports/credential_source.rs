//! Credential source port
//!
//! Supplies the bearer credentials a remote store authenticates with.
//! Implementations decide where credentials live (environment, OS keyring)
//! and how they are refreshed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth tokens for the cloud provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Port trait for obtaining current credentials
#[async_trait::async_trait]
pub trait ICredentialSource: Send + Sync {
    /// Returns tokens whose access token is currently valid
    async fn tokens(&self) -> anyhow::Result<Tokens>;
}
