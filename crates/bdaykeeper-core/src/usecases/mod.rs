//! Use cases (interactors) for bdaykeeper
//!
//! Thin coordinators that combine domain types with port interfaces.
//!
//! ## Use Cases
//!
//! - [`LayeredConfigSource`] - Resolves target settings from admin, remote and bundled layers
//! - [`FetchRemoteConfigUseCase`] - Refreshes the cached remote configuration document

pub mod fetch_remote_config;
pub mod layered_config;

pub use fetch_remote_config::{
    load_cached_document, store_document, FetchRemoteConfigUseCase, RemoteConfigOutcome,
};
pub use layered_config::LayeredConfigSource;
