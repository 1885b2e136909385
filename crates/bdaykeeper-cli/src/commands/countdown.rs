//! Countdown command - Show the notification instant and the time left

use anyhow::{Context, Result};
use bdaykeeper_core::{
    domain::TARGET_TIME_ZONE,
    ports::{keys, ISettingsStore},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Args;

use super::CliContext;

#[derive(Debug, Args)]
pub struct CountdownCommand {}

impl CountdownCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let (source, settings) = ctx.config_source()?;

        let birthday = source.birthday()?;
        let fire_at = birthday
            .fire_instant()
            .with_context(|| format!("Cannot compose notification instant from {birthday:?}"))?;
        let now = Utc::now();
        let remaining = fire_at - now;
        let recorded = settings
            .get_i64(keys::NOTIFICATION_SCHEDULED_AT)?
            .and_then(|m| Utc.timestamp_millis_opt(m).single());

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "fire_at": fire_at.to_rfc3339(),
                "fire_at_local": fire_at.with_timezone(&TARGET_TIME_ZONE).to_rfc3339(),
                "time_zone": TARGET_TIME_ZONE.name(),
                "remaining_secs": remaining.num_seconds(),
                "passed": remaining <= Duration::zero(),
                "scheduled_at": recorded.map(|at: DateTime<Utc>| at.to_rfc3339()),
            }));
            return Ok(());
        }

        if remaining > Duration::zero() {
            formatter.success(&format!("{} to go", format_remaining(remaining)));
        } else {
            formatter.success(&format!("The moment passed {} ago", format_remaining(-remaining)));
        }
        formatter.field(
            TARGET_TIME_ZONE.name(),
            &fire_at
                .with_timezone(&TARGET_TIME_ZONE)
                .format("%Y-%m-%d %H:%M %Z")
                .to_string(),
        );
        formatter.field("UTC", &fire_at.format("%Y-%m-%d %H:%M UTC").to_string());
        match recorded {
            Some(at) if at == fire_at => formatter.field("Notification", "armed by daemon"),
            Some(at) => formatter.field(
                "Notification",
                &format!("armed for {} (daemon restart pending)", at.to_rfc3339()),
            ),
            None => formatter.field("Notification", "not armed"),
        }
        Ok(())
    }
}

/// Renders a positive duration as `12d 3h 4m`, dropping leading zero units
pub fn format_remaining(remaining: Duration) -> String {
    let total_minutes = remaining.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
