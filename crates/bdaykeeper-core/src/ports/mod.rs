//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Read-only cloud folder access (Google Drive)
//! - [`ICredentialSource`] - Bearer credentials for the remote store
//! - [`IConfigSource`] - Resolved sync target and notification instant
//! - [`IAlarmBackend`] - Host timer facility for one-shot alarms
//! - [`ISettingsStore`] - Flat key/value persistence

pub mod alarm_backend;
pub mod config_source;
pub mod credential_source;
pub mod remote_store;
pub mod settings_store;

pub use alarm_backend::{AlarmError, AlarmReceiver, IAlarmBackend};
pub use config_source::{IConfigSource, SyncTarget, TargetSettings};
pub use credential_source::{ICredentialSource, Tokens};
pub use remote_store::{ByteStream, IRemoteStore, Ready, RemoteStoreError};
pub use settings_store::{keys, ISettingsStore, MemorySettingsStore, SettingsError};
