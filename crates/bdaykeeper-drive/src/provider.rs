//! DriveRemoteStore - IRemoteStore implementation for Google Drive
//!
//! Wraps the [`DriveClient`] and a credential source to fulfil the
//! [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - Uses `tokio::sync::Mutex` because `initialize` swaps the client's access
//!   token while the port methods take `&self`.
//! - Each call works on a clone of the client taken under the lock, so a
//!   long download never blocks a concurrent token refresh.
//! - `initialize` may be called before every pass; the credential source
//!   decides whether a refresh is needed.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use bdaykeeper_core::{
    config::Config,
    domain::{FileMetadata, RemoteId},
    ports::{ByteStream, ICredentialSource, IRemoteStore, Ready, RemoteStoreError},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{auth::credential_source_from_config, client::DriveClient};

/// Remote store backed by the Google Drive v3 API
pub struct DriveRemoteStore {
    client: Mutex<DriveClient>,
    credentials: Arc<dyn ICredentialSource>,
    ready: AtomicBool,
}

impl DriveRemoteStore {
    /// Creates a store; no request is made until [`IRemoteStore::initialize`]
    pub fn new(client: DriveClient, credentials: Arc<dyn ICredentialSource>) -> Self {
        Self {
            client: Mutex::new(client),
            credentials,
            ready: AtomicBool::new(false),
        }
    }

    /// Builds a store from the `drive` and `auth` configuration sections
    pub fn from_config(config: &Config) -> Self {
        let client = DriveClient::with_base_url("", config.drive.base_url.clone())
            .with_timeouts(
                Duration::from_secs(config.drive.request_timeout_secs),
                Duration::from_secs(config.drive.download_timeout_secs),
            )
            .with_page_size(config.drive.page_size);

        Self::new(client, credential_source_from_config(&config.auth))
    }

    /// Returns a snapshot of the client once initialized
    async fn ready_client(&self) -> Result<DriveClient, RemoteStoreError> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(RemoteStoreError::NotReady);
        }
        Ok(self.client.lock().await.clone())
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DriveRemoteStore {
    async fn initialize(&self) -> Result<Ready, RemoteStoreError> {
        let tokens = self
            .credentials
            .tokens()
            .await
            .map_err(|e| RemoteStoreError::Auth(format!("{e:#}")))?;

        self.client.lock().await.set_access_token(tokens.access_token);
        self.ready.store(true, Ordering::Release);
        debug!(expires_at = %tokens.expires_at, "DriveRemoteStore initialized");
        Ok(Ready)
    }

    async fn list_files_in_folder(
        &self,
        folder_id: &RemoteId,
    ) -> Result<Vec<FileMetadata>, RemoteStoreError> {
        let client = self.ready_client().await?;
        debug!(folder = %folder_id, "DriveRemoteStore::list_files_in_folder");
        Ok(client.list_folder(folder_id).await?)
    }

    async fn get_file_info(&self, file_id: &RemoteId) -> Result<FileMetadata, RemoteStoreError> {
        let client = self.ready_client().await?;
        debug!(id = %file_id, "DriveRemoteStore::get_file_info");
        Ok(client.get_file(file_id).await?)
    }

    async fn download_file(&self, file_id: &RemoteId) -> Result<ByteStream, RemoteStoreError> {
        let client = self.ready_client().await?;
        debug!(id = %file_id, "DriveRemoteStore::download_file");
        Ok(client.download(file_id).await?)
    }
}
