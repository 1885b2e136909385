//! Tokio timer backend
//!
//! Each armed identity owns one spawned task that sleeps until the fire
//! instant and then calls the receiver. Arming an identity aborts its
//! previous task.
//!
//! Timers run on the monotonic clock. The delay is computed from the wall
//! clock once, when the alarm is armed; a long host suspend therefore delays
//! delivery but never brings it forward.

use std::{sync::Arc, time::Duration};

use bdaykeeper_core::{
    config::AlarmConfig,
    domain::{AlarmIdentity, ScheduleRequest},
    ports::{AlarmError, AlarmReceiver, IAlarmBackend},
};
use chrono::Utc;
use dashmap::DashMap;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::debug;

/// [`IAlarmBackend`] backed by tokio sleeps
pub struct TokioAlarmBackend {
    timers: DashMap<AlarmIdentity, JoinHandle<()>>,
    receiver: Arc<dyn AlarmReceiver>,
    runtime: Handle,
    allow_exact: bool,
    inexact_slack: Duration,
}

impl TokioAlarmBackend {
    /// Creates a backend on the current tokio runtime
    ///
    /// # Errors
    /// Returns [`AlarmError::Unavailable`] outside of a tokio runtime.
    pub fn new(
        receiver: Arc<dyn AlarmReceiver>,
        allow_exact: bool,
        inexact_slack: Duration,
    ) -> Result<Self, AlarmError> {
        let runtime =
            Handle::try_current().map_err(|e| AlarmError::Unavailable(e.to_string()))?;
        Ok(Self {
            timers: DashMap::new(),
            receiver,
            runtime,
            allow_exact,
            inexact_slack,
        })
    }

    pub fn from_config(
        config: &AlarmConfig,
        receiver: Arc<dyn AlarmReceiver>,
    ) -> Result<Self, AlarmError> {
        Self::new(
            receiver,
            config.allow_exact,
            Duration::from_secs(config.inexact_slack_secs),
        )
    }

    /// Number of timers that have not fired or been cancelled yet
    pub fn pending(&self) -> usize {
        self.timers.iter().filter(|t| !t.value().is_finished()).count()
    }

    fn arm(&self, request: &ScheduleRequest, slack: Duration) {
        let until_fire = (request.fire_at() - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let delay = until_fire + slack;

        let receiver = Arc::clone(&self.receiver);
        let req = request.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            receiver.on_alarm(&req);
        });

        debug!(
            identity = %request.identity,
            delay_secs = delay.as_secs(),
            "Timer armed"
        );
        if let Some(previous) = self.timers.insert(request.identity.clone(), handle) {
            previous.abort();
        }
    }
}

impl IAlarmBackend for TokioAlarmBackend {
    fn can_schedule_exact(&self) -> bool {
        self.allow_exact
    }

    fn set_exact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
        if !self.allow_exact {
            return Err(AlarmError::PermissionDenied);
        }
        self.arm(request, Duration::ZERO);
        Ok(())
    }

    fn set_inexact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
        self.arm(request, self.inexact_slack);
        Ok(())
    }

    fn cancel(&self, identity: &AlarmIdentity) {
        if let Some((_, handle)) = self.timers.remove(identity) {
            handle.abort();
            debug!(identity = %identity, "Timer cancelled");
        }
    }
}

impl Drop for TokioAlarmBackend {
    fn drop(&mut self) {
        for timer in self.timers.iter() {
            timer.value().abort();
        }
    }
}
