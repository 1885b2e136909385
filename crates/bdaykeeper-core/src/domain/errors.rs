//! Domain error types
//!
//! Validation failures raised while constructing domain values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote file or folder ID
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid alarm identity key
    #[error("Invalid alarm identity: {0}")]
    InvalidIdentity(String),

    /// A calendar date or wall-clock time that cannot exist
    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
