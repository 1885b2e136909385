//! Alarm backend port
//!
//! The host's timer facility. The scheduler in `bdaykeeper-alarm` owns the
//! per-identity state machine and calls into this port to arm and disarm
//! platform timers.
//!
//! Backends key alarms by [`AlarmIdentity`]: arming an identity that already
//! has a timer replaces it.

use thiserror::Error;

use crate::domain::{newtypes::AlarmIdentity, schedule::ScheduleRequest};

/// Errors raised by an alarm backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlarmError {
    /// Precise alarms are not permitted on this host
    #[error("Exact alarm permission denied")]
    PermissionDenied,

    /// The backend could not register the timer
    #[error("Alarm backend unavailable: {0}")]
    Unavailable(String),
}

/// Port trait for the host timer facility
///
/// Every method must be fast and non-blocking.
pub trait IAlarmBackend: Send + Sync {
    /// Whether precise, wake-capable alarms may be scheduled right now
    fn can_schedule_exact(&self) -> bool;

    /// Arms a precise alarm at the requested instant
    fn set_exact(&self, request: &ScheduleRequest) -> Result<(), AlarmError>;

    /// Arms an alarm delivered at or after the requested instant
    fn set_inexact(&self, request: &ScheduleRequest) -> Result<(), AlarmError>;

    /// Disarms the alarm for `identity`; no-op when none is armed
    fn cancel(&self, identity: &AlarmIdentity);
}

/// Fixed receiver of fired alarms
///
/// Turning a delivery into a user-visible notification is the receiver's job.
pub trait AlarmReceiver: Send + Sync {
    fn on_alarm(&self, request: &ScheduleRequest);
}
