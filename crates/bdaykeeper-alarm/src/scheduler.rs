//! Alarm scheduler
//!
//! Owns the per-identity lifecycle `Unarmed -> Armed -> Fired` or
//! `Armed -> Cancelled` and talks to the host timer facility through
//! [`IAlarmBackend`].
//!
//! ## Scheduling rules
//!
//! - A request whose instant is not strictly in the future is ignored.
//! - A precise alarm is attempted when the backend reports the capability;
//!   a `PermissionDenied` answer degrades to an inexact alarm.
//! - Scheduling an identity again replaces its armed alarm. The backend
//!   replaces the timer and the registry drops deliveries that no longer
//!   match, so at most one delivery reaches the receiver.
//! - The registry records `Armed` before the backend is called and is
//!   rolled back if the backend refuses.
//!
//! All operations are synchronous and never block.

use std::sync::Arc;

use bdaykeeper_core::{
    domain::{AlarmIdentity, AlarmPrecision, AlarmState, ScheduleRequest},
    ports::{AlarmError, IAlarmBackend},
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::registry::AlarmRegistry;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a call to [`AlarmScheduler::schedule`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The instant was not in the future; nothing changed
    Skipped,
    /// An alarm is now armed with the given precision
    Armed(AlarmPrecision),
}

/// Arms, supersedes and cancels one-shot alarms
pub struct AlarmScheduler {
    backend: Arc<dyn IAlarmBackend>,
    registry: AlarmRegistry,
    clock: Arc<dyn Clock>,
}

impl AlarmScheduler {
    pub fn new(backend: Arc<dyn IAlarmBackend>, registry: AlarmRegistry) -> Self {
        Self {
            backend,
            registry,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for the "in the future" check
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &AlarmRegistry {
        &self.registry
    }

    pub fn state(&self, identity: &AlarmIdentity) -> AlarmState {
        self.registry.state(identity)
    }

    /// Arms an alarm for `request`, superseding any armed alarm of the same
    /// identity
    ///
    /// # Errors
    /// Returns [`AlarmError::Unavailable`] if the backend cannot register any
    /// timer. The previous alarm, if any, stays armed in that case.
    pub fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome, AlarmError> {
        let now = self.clock.now();
        if !request.is_in_future(now) {
            debug!(
                identity = %request.identity,
                fire_at = %request.fire_at(),
                now = %now,
                "Alarm instant is not in the future, skipping"
            );
            return Ok(ScheduleOutcome::Skipped);
        }

        let precision = if self.backend.can_schedule_exact() {
            match self.arm(request, AlarmPrecision::Exact) {
                Ok(()) => AlarmPrecision::Exact,
                Err(AlarmError::PermissionDenied) => {
                    debug!(identity = %request.identity, "Exact alarm denied, using inexact");
                    self.arm(request, AlarmPrecision::Inexact)?;
                    AlarmPrecision::Inexact
                }
                Err(e) => return Err(e),
            }
        } else {
            self.arm(request, AlarmPrecision::Inexact)?;
            AlarmPrecision::Inexact
        };

        info!(
            identity = %request.identity,
            fire_at = %request.fire_at(),
            precision = ?precision,
            "Alarm armed"
        );
        Ok(ScheduleOutcome::Armed(precision))
    }

    /// Records the alarm as armed, then registers the timer
    ///
    /// The registry is updated first so a backend that delivers before
    /// returning finds the live alarm. A backend error puts the previous
    /// state back.
    fn arm(&self, request: &ScheduleRequest, precision: AlarmPrecision) -> Result<(), AlarmError> {
        let armed = AlarmState::Armed {
            fire_at_epoch_millis: request.fire_at_epoch_millis,
            precision,
        };
        let previous = self.registry.replace(request.identity.clone(), armed.clone());
        if previous.as_ref().is_some_and(AlarmState::is_armed) {
            debug!(identity = %request.identity, previous = ?previous, "Superseding armed alarm");
        }

        let result = match precision {
            AlarmPrecision::Exact => self.backend.set_exact(request),
            AlarmPrecision::Inexact => self.backend.set_inexact(request),
        };
        if result.is_err() {
            self.registry.restore(&request.identity, &armed, previous);
        }
        result
    }

    /// Disarms the alarm for `identity`; safe when nothing is armed
    pub fn cancel(&self, identity: &AlarmIdentity) {
        self.backend.cancel(identity);
        let previous = self.registry.state(identity);
        self.registry.set(identity.clone(), AlarmState::Cancelled);

        if previous.is_armed() {
            info!(identity = %identity, "Alarm cancelled");
        } else {
            debug!(identity = %identity, previous = ?previous, "Cancel requested but no alarm was armed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bdaykeeper_core::ports::AlarmReceiver;
    use chrono::{Duration, TimeZone};

    use super::*;

    // ------------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------------

    /// Backend that keeps armed requests in a map, replacing per identity
    #[derive(Default)]
    struct RecordingAlarmBackend {
        exact_allowed: bool,
        deny_exact: bool,
        unavailable: bool,
        armed: Mutex<Vec<(ScheduleRequest, AlarmPrecision)>>,
        cancels: Mutex<Vec<AlarmIdentity>>,
    }

    impl RecordingAlarmBackend {
        fn exact() -> Self {
            Self {
                exact_allowed: true,
                ..Default::default()
            }
        }

        fn arm(&self, request: &ScheduleRequest, precision: AlarmPrecision) -> Result<(), AlarmError> {
            if self.unavailable {
                return Err(AlarmError::Unavailable("no timer service".into()));
            }
            let mut armed = self.armed.lock().unwrap();
            armed.retain(|(r, _)| r.identity != request.identity);
            armed.push((request.clone(), precision));
            Ok(())
        }

        fn armed(&self) -> Vec<(ScheduleRequest, AlarmPrecision)> {
            self.armed.lock().unwrap().clone()
        }

        /// Fires every armed alarm into `receiver`, as the host would
        fn fire_all(&self, receiver: &dyn AlarmReceiver) {
            let armed = std::mem::take(&mut *self.armed.lock().unwrap());
            for (request, _) in armed {
                receiver.on_alarm(&request);
            }
        }
    }

    impl IAlarmBackend for RecordingAlarmBackend {
        fn can_schedule_exact(&self) -> bool {
            self.exact_allowed
        }

        fn set_exact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
            if self.deny_exact {
                return Err(AlarmError::PermissionDenied);
            }
            self.arm(request, AlarmPrecision::Exact)
        }

        fn set_inexact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
            self.arm(request, AlarmPrecision::Inexact)
        }

        fn cancel(&self, identity: &AlarmIdentity) {
            self.cancels.lock().unwrap().push(identity.clone());
            self.armed.lock().unwrap().retain(|(r, _)| &r.identity != identity);
        }
    }

    /// Backend whose host delivers the alarm before `set_*` returns
    #[derive(Default)]
    struct ImmediateAlarmBackend {
        receiver: Mutex<Option<Arc<dyn AlarmReceiver>>>,
    }

    impl ImmediateAlarmBackend {
        fn deliver(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
            if let Some(receiver) = self.receiver.lock().unwrap().as_ref() {
                receiver.on_alarm(request);
            }
            Ok(())
        }
    }

    impl IAlarmBackend for ImmediateAlarmBackend {
        fn can_schedule_exact(&self) -> bool {
            true
        }

        fn set_exact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
            self.deliver(request)
        }

        fn set_inexact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
            self.deliver(request)
        }

        fn cancel(&self, _identity: &AlarmIdentity) {}
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct Deliveries(Mutex<Vec<i64>>);

    impl AlarmReceiver for Deliveries {
        fn on_alarm(&self, request: &ScheduleRequest) {
            self.0.lock().unwrap().push(request.fire_at_epoch_millis);
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn scheduler(backend: Arc<RecordingAlarmBackend>) -> AlarmScheduler {
        AlarmScheduler::new(backend, AlarmRegistry::new()).with_clock(Arc::new(FixedClock(now())))
    }

    fn request_at(at: DateTime<Utc>) -> ScheduleRequest {
        ScheduleRequest::new(AlarmIdentity::birthday(), at)
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_future_instant_arms_exact() {
        let backend = Arc::new(RecordingAlarmBackend::exact());
        let scheduler = scheduler(backend.clone());
        let req = request_at(now() + Duration::hours(1));

        let outcome = scheduler.schedule(&req).unwrap();

        assert_eq!(outcome, ScheduleOutcome::Armed(AlarmPrecision::Exact));
        assert_eq!(backend.armed(), vec![(req.clone(), AlarmPrecision::Exact)]);
        assert_eq!(
            scheduler.state(&req.identity),
            AlarmState::Armed {
                fire_at_epoch_millis: req.fire_at_epoch_millis,
                precision: AlarmPrecision::Exact
            }
        );
    }

    #[test]
    fn test_past_instant_is_noop() {
        let backend = Arc::new(RecordingAlarmBackend::exact());
        let scheduler = scheduler(backend.clone());

        let past = scheduler.schedule(&request_at(now() - Duration::days(1))).unwrap();
        let present = scheduler.schedule(&request_at(now())).unwrap();

        assert_eq!(past, ScheduleOutcome::Skipped);
        assert_eq!(present, ScheduleOutcome::Skipped);
        assert!(backend.armed().is_empty());
        assert_eq!(scheduler.state(&AlarmIdentity::birthday()), AlarmState::Unarmed);
    }

    #[test]
    fn test_reschedule_leaves_single_alarm_at_second_instant() {
        let backend = Arc::new(RecordingAlarmBackend::exact());
        let registry = AlarmRegistry::new();
        let deliveries = Arc::new(Deliveries::default());
        let receiver = registry.tracking(deliveries.clone());
        let scheduler = AlarmScheduler::new(backend.clone(), registry)
            .with_clock(Arc::new(FixedClock(now())));

        let first = request_at(now() + Duration::hours(1));
        let second = request_at(now() + Duration::hours(2));
        scheduler.schedule(&first).unwrap();
        scheduler.schedule(&second).unwrap();

        assert_eq!(backend.armed().len(), 1);
        // A late delivery of the superseded timer must not get through
        receiver.on_alarm(&first);
        backend.fire_all(receiver.as_ref());

        assert_eq!(*deliveries.0.lock().unwrap(), vec![second.fire_at_epoch_millis]);
        assert_eq!(
            scheduler.state(&second.identity),
            AlarmState::Fired {
                fire_at_epoch_millis: second.fire_at_epoch_millis
            }
        );
    }

    #[test]
    fn test_without_exact_capability_uses_inexact() {
        let backend = Arc::new(RecordingAlarmBackend::default());
        let scheduler = scheduler(backend.clone());

        let outcome = scheduler.schedule(&request_at(now() + Duration::minutes(5))).unwrap();

        assert_eq!(outcome, ScheduleOutcome::Armed(AlarmPrecision::Inexact));
        assert_eq!(backend.armed()[0].1, AlarmPrecision::Inexact);
    }

    #[test]
    fn test_permission_denied_falls_back_to_inexact() {
        let backend = Arc::new(RecordingAlarmBackend {
            exact_allowed: true,
            deny_exact: true,
            ..Default::default()
        });
        let scheduler = scheduler(backend.clone());

        let outcome = scheduler.schedule(&request_at(now() + Duration::minutes(5))).unwrap();

        assert_eq!(outcome, ScheduleOutcome::Armed(AlarmPrecision::Inexact));
        assert_eq!(backend.armed().len(), 1);
    }

    #[test]
    fn test_unavailable_backend_keeps_previous_alarm() {
        let backend = Arc::new(RecordingAlarmBackend::exact());
        let scheduler = scheduler(backend.clone());
        let first = request_at(now() + Duration::hours(1));
        scheduler.schedule(&first).unwrap();

        let broken = Arc::new(RecordingAlarmBackend {
            exact_allowed: true,
            unavailable: true,
            ..Default::default()
        });
        let broken_scheduler = AlarmScheduler::new(broken, scheduler.registry().clone())
            .with_clock(Arc::new(FixedClock(now())));

        let err = broken_scheduler
            .schedule(&request_at(now() + Duration::hours(2)))
            .unwrap_err();

        assert!(matches!(err, AlarmError::Unavailable(_)));
        assert_eq!(
            scheduler.state(&first.identity),
            AlarmState::Armed {
                fire_at_epoch_millis: first.fire_at_epoch_millis,
                precision: AlarmPrecision::Exact
            }
        );
    }

    #[test]
    fn test_cancel_disarms() {
        let backend = Arc::new(RecordingAlarmBackend::exact());
        let scheduler = scheduler(backend.clone());
        let req = request_at(now() + Duration::hours(1));
        scheduler.schedule(&req).unwrap();

        scheduler.cancel(&req.identity);

        assert!(backend.armed().is_empty());
        assert_eq!(scheduler.state(&req.identity), AlarmState::Cancelled);
    }

    #[test]
    fn test_cancel_when_unarmed_is_safe() {
        let backend = Arc::new(RecordingAlarmBackend::exact());
        let scheduler = scheduler(backend.clone());

        scheduler.cancel(&AlarmIdentity::birthday());
        scheduler.cancel(&AlarmIdentity::birthday());

        assert_eq!(backend.cancels.lock().unwrap().len(), 2);
        assert_eq!(scheduler.state(&AlarmIdentity::birthday()), AlarmState::Cancelled);
    }

    #[test]
    fn test_schedule_after_cancel_starts_new_alarm() {
        let backend = Arc::new(RecordingAlarmBackend::exact());
        let scheduler = scheduler(backend.clone());
        let req = request_at(now() + Duration::hours(1));

        scheduler.schedule(&req).unwrap();
        scheduler.cancel(&req.identity);
        scheduler.schedule(&req).unwrap();

        assert!(scheduler.state(&req.identity).is_armed());
        assert_eq!(backend.armed().len(), 1);
    }

    #[test]
    fn test_delivery_during_arming_reaches_receiver() {
        let backend = Arc::new(ImmediateAlarmBackend::default());
        let registry = AlarmRegistry::new();
        let deliveries = Arc::new(Deliveries::default());
        let receiver: Arc<dyn AlarmReceiver> = registry.tracking(deliveries.clone());
        *backend.receiver.lock().unwrap() = Some(receiver);
        let scheduler = AlarmScheduler::new(backend, registry).with_clock(Arc::new(FixedClock(now())));
        let req = request_at(now() + Duration::seconds(1));

        let outcome = scheduler.schedule(&req).unwrap();

        assert_eq!(outcome, ScheduleOutcome::Armed(AlarmPrecision::Exact));
        assert_eq!(*deliveries.0.lock().unwrap(), vec![req.fire_at_epoch_millis]);
        assert_eq!(
            scheduler.state(&req.identity),
            AlarmState::Fired {
                fire_at_epoch_millis: req.fire_at_epoch_millis
            }
        );
    }

    #[test]
    fn test_failed_first_arming_leaves_identity_unarmed() {
        let backend = Arc::new(RecordingAlarmBackend {
            exact_allowed: true,
            deny_exact: true,
            unavailable: true,
            ..Default::default()
        });
        let scheduler = scheduler(backend);

        let err = scheduler
            .schedule(&request_at(now() + Duration::hours(1)))
            .unwrap_err();

        assert!(matches!(err, AlarmError::Unavailable(_)));
        assert_eq!(scheduler.state(&AlarmIdentity::birthday()), AlarmState::Unarmed);
        assert!(scheduler.registry().snapshot().is_empty());
    }
}
