//! Birthday target instant
//!
//! The notification fires at a wall-clock date and time interpreted in a
//! fixed zone ([`TARGET_TIME_ZONE`]), never in the host's local zone.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Zone in which the target date and time are interpreted
pub const TARGET_TIME_ZONE: Tz = chrono_tz::Europe::Warsaw;

/// Wall-clock components of the notification instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayTarget {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub day: u32,
    /// 0-23
    pub hour: u32,
    /// 0-59
    pub minute: u32,
}

impl BirthdayTarget {
    /// Checks that the components name a real calendar date and time
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=12).contains(&self.month) {
            return Err(DomainError::InvalidDateTime(format!(
                "month must be in 1..=12, got {}",
                self.month
            )));
        }
        if self.hour > 23 {
            return Err(DomainError::InvalidDateTime(format!(
                "hour must be in 0..=23, got {}",
                self.hour
            )));
        }
        if self.minute > 59 {
            return Err(DomainError::InvalidDateTime(format!(
                "minute must be in 0..=59, got {}",
                self.minute
            )));
        }
        if NaiveDate::from_ymd_opt(self.year, self.month, self.day).is_none() {
            return Err(DomainError::InvalidDateTime(format!(
                "{:04}-{:02}-{:02} is not a calendar date",
                self.year, self.month, self.day
            )));
        }
        Ok(())
    }

    /// Resolves the target to an absolute instant
    ///
    /// An ambiguous local time (clocks going back) resolves to the earlier
    /// instant. A local time skipped by a forward transition is moved one
    /// hour later.
    pub fn fire_instant(&self) -> Result<DateTime<Utc>, DomainError> {
        self.validate()?;
        let naive = NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, 0))
            .ok_or_else(|| DomainError::InvalidDateTime(format!("{self:?}")))?;

        let local = TARGET_TIME_ZONE
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                TARGET_TIME_ZONE
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .ok_or_else(|| {
                DomainError::InvalidDateTime(format!("{naive} does not exist in {TARGET_TIME_ZONE}"))
            })?;

        Ok(local.with_timezone(&Utc))
    }
}
