//! Domain entities and business logic
//!
//! This module contains the core domain types for bdaykeeper:
//! - Newtypes for remote identifiers and alarm identities
//! - Remote file metadata and the local cache snapshot
//! - The pure sync decision (candidate selection and staleness)
//! - Alarm scheduling requests and lifecycle states
//! - The remote configuration document
//! - Birthday target instant composition
//! - Domain-specific error types

pub mod cache_entry;
pub mod decision;
pub mod errors;
pub mod file_metadata;
pub mod newtypes;
pub mod remote_config;
pub mod schedule;
pub mod target;

// Re-export commonly used types
pub use cache_entry::LocalCacheEntry;
pub use decision::{decide, select_candidate, SyncDecision};
pub use errors::DomainError;
pub use file_metadata::FileMetadata;
pub use newtypes::{AlarmIdentity, RemoteId};
pub use remote_config::{RemoteConfigDocument, RemoteConfigError};
pub use schedule::{AlarmPrecision, AlarmState, ScheduleRequest};
pub use target::{BirthdayTarget, TARGET_TIME_ZONE};
