//! Alarm scheduling types
//!
//! A [`ScheduleRequest`] asks for a one-shot wake-up at an absolute instant.
//! At most one alarm is armed per [`AlarmIdentity`]; a new request for the
//! same identity supersedes the previous one.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::AlarmIdentity;

/// Request to arm a one-shot alarm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Absolute fire instant in milliseconds since the Unix epoch
    pub fire_at_epoch_millis: i64,
    /// Stable request key
    pub identity: AlarmIdentity,
}

impl ScheduleRequest {
    pub fn new(identity: AlarmIdentity, fire_at: DateTime<Utc>) -> Self {
        Self {
            fire_at_epoch_millis: fire_at.timestamp_millis(),
            identity,
        }
    }

    /// Fire instant as a UTC timestamp
    ///
    /// Values outside chrono's range clamp to the Unix epoch.
    pub fn fire_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.fire_at_epoch_millis)
            .single()
            .unwrap_or_default()
    }

    /// Returns true if the fire instant lies strictly after `now`
    pub fn is_in_future(&self, now: DateTime<Utc>) -> bool {
        self.fire_at_epoch_millis > now.timestamp_millis()
    }
}

/// How precisely an armed alarm will be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmPrecision {
    /// Wake-capable alarm delivered at the requested instant
    Exact,
    /// Degraded alarm delivered at or after the requested instant
    Inexact,
}

/// Lifecycle of the alarm registered under one identity
///
/// `Unarmed -> Armed -> Fired` or `Armed -> Cancelled`. `Fired` and
/// `Cancelled` end that alarm; scheduling the identity again starts a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlarmState {
    Unarmed,
    Armed {
        fire_at_epoch_millis: i64,
        precision: AlarmPrecision,
    },
    Fired {
        fire_at_epoch_millis: i64,
    },
    Cancelled,
}

impl AlarmState {
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    /// Returns true for states that end an alarm's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fired { .. } | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_request_round_trips_instant() {
        let at: DateTime<Utc> = "2030-01-01T00:00:00.250Z".parse().unwrap();
        let req = ScheduleRequest::new(AlarmIdentity::birthday(), at);
        assert_eq!(req.fire_at(), at);
    }

    #[test]
    fn test_is_in_future() {
        let now: DateTime<Utc> = "2030-01-01T00:00:00Z".parse().unwrap();
        let id = AlarmIdentity::birthday();
        assert!(ScheduleRequest::new(id.clone(), now + Duration::milliseconds(1)).is_in_future(now));
        assert!(!ScheduleRequest::new(id.clone(), now).is_in_future(now));
        assert!(!ScheduleRequest::new(id, now - Duration::days(1)).is_in_future(now));
    }

    #[test]
    fn test_state_predicates() {
        let armed = AlarmState::Armed {
            fire_at_epoch_millis: 1,
            precision: AlarmPrecision::Exact,
        };
        assert!(armed.is_armed());
        assert!(!armed.is_terminal());
        assert!(AlarmState::Cancelled.is_terminal());
        assert!(AlarmState::Fired {
            fire_at_epoch_millis: 1
        }
        .is_terminal());
        assert!(!AlarmState::Unarmed.is_terminal());
    }
}
