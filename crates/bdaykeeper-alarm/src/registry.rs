//! Per-identity alarm state
//!
//! The registry is shared between the scheduler, which records arming and
//! cancellation, and the [`TrackingReceiver`], which records delivery. A
//! delivery that does not match the currently armed instant belongs to a
//! superseded alarm and is dropped.

use std::sync::Arc;

use bdaykeeper_core::{
    domain::{AlarmIdentity, AlarmState, ScheduleRequest},
    ports::AlarmReceiver,
};
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, info};

/// Concurrent map of alarm identity to lifecycle state
#[derive(Debug, Clone, Default)]
pub struct AlarmRegistry {
    states: Arc<DashMap<AlarmIdentity, AlarmState>>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; identities never seen read as `Unarmed`
    pub fn state(&self, identity: &AlarmIdentity) -> AlarmState {
        self.states
            .get(identity)
            .map(|r| r.value().clone())
            .unwrap_or(AlarmState::Unarmed)
    }

    pub(crate) fn set(&self, identity: AlarmIdentity, state: AlarmState) {
        self.states.insert(identity, state);
    }

    /// Records `state` and returns what was stored before, `None` if nothing
    pub(crate) fn replace(&self, identity: AlarmIdentity, state: AlarmState) -> Option<AlarmState> {
        self.states.insert(identity, state)
    }

    /// Puts `previous` back if the entry still holds `recorded`
    ///
    /// An entry that moved on (for example to `Fired`) is left alone.
    pub(crate) fn restore(
        &self,
        identity: &AlarmIdentity,
        recorded: &AlarmState,
        previous: Option<AlarmState>,
    ) {
        if let Entry::Occupied(mut entry) = self.states.entry(identity.clone()) {
            if entry.get() != recorded {
                return;
            }
            match previous {
                Some(state) => {
                    entry.insert(state);
                }
                None => {
                    entry.remove();
                }
            }
        }
    }

    /// Moves an armed alarm to `Fired` if `request` matches it
    ///
    /// Returns false for deliveries of superseded or cancelled alarms.
    pub fn mark_fired(&self, request: &ScheduleRequest) -> bool {
        let Some(mut entry) = self.states.get_mut(&request.identity) else {
            return false;
        };

        let fire_at_epoch_millis = match entry.value() {
            AlarmState::Armed {
                fire_at_epoch_millis,
                ..
            } => *fire_at_epoch_millis,
            _ => return false,
        };
        if fire_at_epoch_millis != request.fire_at_epoch_millis {
            return false;
        }

        *entry.value_mut() = AlarmState::Fired {
            fire_at_epoch_millis,
        };
        true
    }

    /// Snapshot of every tracked identity, sorted by identity
    pub fn snapshot(&self) -> Vec<(AlarmIdentity, AlarmState)> {
        let mut all: Vec<_> = self
            .states
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        all
    }

    /// Wraps `inner` so deliveries update this registry first
    pub fn tracking(&self, inner: Arc<dyn AlarmReceiver>) -> Arc<TrackingReceiver> {
        Arc::new(TrackingReceiver {
            registry: self.clone(),
            inner,
        })
    }
}

/// [`AlarmReceiver`] that forwards only deliveries of the live alarm
pub struct TrackingReceiver {
    registry: AlarmRegistry,
    inner: Arc<dyn AlarmReceiver>,
}

impl AlarmReceiver for TrackingReceiver {
    fn on_alarm(&self, request: &ScheduleRequest) {
        if self.registry.mark_fired(request) {
            info!(identity = %request.identity, fire_at = %request.fire_at(), "Alarm fired");
            self.inner.on_alarm(request);
        } else {
            debug!(identity = %request.identity, "Dropping stale alarm delivery");
        }
    }
}
