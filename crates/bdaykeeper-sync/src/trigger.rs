//! Periodic sync trigger
//!
//! Drives a [`SyncPass`] on a fixed interval. A pass that asks for a retry is
//! re-run after an exponential backoff (`retry_base * 2^n`, capped by both
//! `retry_max` and the interval). Terminal failures wait for the next regular
//! interval. Repeated credential failures are escalated from `warn` to
//! `error` once they reach the alert threshold.

use std::{sync::Arc, time::Duration};

use bdaykeeper_core::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::{PassOutcome, SyncPass};

/// Largest exponent applied to the retry base
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Timing parameters for the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Delay between regular passes
    pub interval: Duration,
    /// First retry delay
    pub retry_base: Duration,
    /// Upper bound for any retry delay
    pub retry_max: Duration,
    /// Consecutive auth failures before escalating (0 disables)
    pub auth_alert_threshold: u32,
}

impl TriggerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.check_interval(),
            retry_base: Duration::from_secs(config.sync.retry_base_secs),
            retry_max: Duration::from_secs(config.sync.retry_max_secs),
            auth_alert_threshold: config.sync.auth_failure_alert_threshold,
        }
    }

    /// Delay before the retry following `attempt` consecutive retries
    /// (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_SHIFT);
        self.retry_base
            .saturating_mul(factor)
            .min(self.retry_max)
            .min(self.interval)
    }
}

/// Counters accumulated over the lifetime of a trigger run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerStats {
    pub passes: u64,
    pub successes: u64,
    pub retries: u64,
    pub failures: u64,
    /// Passes logged at `error` because of repeated auth failures
    pub auth_alerts: u64,
}

/// Runs sync passes until cancelled
pub struct PeriodicTrigger {
    pass: Arc<dyn SyncPass>,
    config: TriggerConfig,
}

impl PeriodicTrigger {
    pub fn new(pass: Arc<dyn SyncPass>, config: TriggerConfig) -> Self {
        Self { pass, config }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Runs the first pass immediately, then keeps rescheduling
    ///
    /// Returns when `cancel` fires. A pass in flight at that moment is
    /// dropped; the cache is only ever replaced by rename, so it stays
    /// consistent.
    pub async fn run(&self, cancel: CancellationToken) -> TriggerStats {
        info!(
            interval_secs = self.config.interval.as_secs(),
            retry_base_secs = self.config.retry_base.as_secs(),
            retry_max_secs = self.config.retry_max.as_secs(),
            "Starting periodic sync trigger"
        );

        let mut stats = TriggerStats::default();
        let mut consecutive_retries: u32 = 0;
        let mut consecutive_auth_failures: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received during sync pass");
                    break;
                }
                outcome = self.pass.run_pass() => outcome,
            };
            stats.passes += 1;

            let delay = match outcome {
                PassOutcome::Success(_) => {
                    stats.successes += 1;
                    consecutive_retries = 0;
                    consecutive_auth_failures = 0;
                    self.config.interval
                }
                PassOutcome::Retry(e) => {
                    stats.retries += 1;
                    let delay = self.config.backoff_delay(consecutive_retries);
                    consecutive_retries = consecutive_retries.saturating_add(1);

                    if e.is_auth() {
                        consecutive_auth_failures = consecutive_auth_failures.saturating_add(1);
                    } else {
                        consecutive_auth_failures = 0;
                    }

                    let threshold = self.config.auth_alert_threshold;
                    if threshold > 0 && consecutive_auth_failures >= threshold {
                        stats.auth_alerts += 1;
                        error!(
                            error = %e,
                            consecutive = consecutive_auth_failures,
                            "Remote store keeps rejecting credentials; re-authorization required"
                        );
                    } else {
                        warn!(
                            error = %e,
                            attempt = consecutive_retries,
                            retry_in_secs = delay.as_secs(),
                            "Sync pass failed, will retry"
                        );
                    }
                    delay
                }
                PassOutcome::Failure(e) => {
                    stats.failures += 1;
                    consecutive_retries = 0;
                    consecutive_auth_failures = 0;
                    error!(error = %e, "Sync pass failed");
                    self.config.interval
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(
            passes = stats.passes,
            successes = stats.successes,
            retries = stats.retries,
            failures = stats.failures,
            "Periodic sync trigger stopped"
        );
        stats
    }
}
