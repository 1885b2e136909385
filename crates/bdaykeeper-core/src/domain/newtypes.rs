//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for remote identifiers and alarm identities.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RemoteId
// ============================================================================

/// Identifier of a file or folder in the cloud store
///
/// Drive IDs are opaque URL-safe strings (letters, digits, `-` and `_`).
/// The alias `root` is accepted for the drive root folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains characters outside
    /// the URL-safe alphabet
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// AlarmIdentity
// ============================================================================

/// Stable key of a scheduled alarm
///
/// At most one alarm is armed per identity; re-scheduling the same
/// identity supersedes the previous alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlarmIdentity(String);

impl AlarmIdentity {
    /// Identity used for the birthday notification alarm
    pub const BIRTHDAY: &'static str = "birthday-notification";

    /// Create a new AlarmIdentity
    ///
    /// # Errors
    /// Returns error if the key is empty or contains whitespace
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.is_empty() {
            return Err(DomainError::InvalidIdentity(
                "Alarm identity cannot be empty".to_string(),
            ));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidIdentity(format!(
                "Alarm identity must not contain whitespace: {key:?}"
            )));
        }
        Ok(Self(key))
    }

    /// The identity of the birthday notification alarm
    #[must_use]
    pub fn birthday() -> Self {
        Self(Self::BIRTHDAY.to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AlarmIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_id_valid() {
        let id = RemoteId::new("1AbC-d_EfG9").unwrap();
        assert_eq!(id.as_str(), "1AbC-d_EfG9");
        assert_eq!(id.to_string(), "1AbC-d_EfG9");
    }

    #[test]
    fn test_remote_id_root_alias() {
        assert!(RemoteId::new("root").is_ok());
    }

    #[test]
    fn test_remote_id_empty_rejected() {
        assert!(matches!(
            RemoteId::new(""),
            Err(DomainError::InvalidRemoteId(_))
        ));
    }

    #[test]
    fn test_remote_id_rejects_query_injection() {
        assert!(RemoteId::new("abc' or '1'='1").is_err());
        assert!(RemoteId::new("a/b").is_err());
    }

    #[test]
    fn test_remote_id_serde_validates() {
        let ok: RemoteId = serde_json::from_str("\"folder_1\"").unwrap();
        assert_eq!(ok.as_str(), "folder_1");

        let bad: Result<RemoteId, _> = serde_json::from_str("\"has space\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_alarm_identity() {
        let id = AlarmIdentity::birthday();
        assert_eq!(id.as_str(), "birthday-notification");
        assert!(AlarmIdentity::new("").is_err());
        assert!(AlarmIdentity::new("two words").is_err());
        assert_eq!(AlarmIdentity::new("x").unwrap().to_string(), "x");
    }
}
