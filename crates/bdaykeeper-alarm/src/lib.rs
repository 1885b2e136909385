//! bdaykeeper Alarm - One-shot alarm scheduling
//!
//! Provides:
//! - [`AlarmScheduler`]: the per-identity state machine that arms, supersedes
//!   and cancels alarms through an [`IAlarmBackend`]
//! - [`AlarmRegistry`]: shared per-identity state, updated on delivery
//! - [`TokioAlarmBackend`]: a backend built on tokio timers
//!
//! ## Wiring
//!
//! The backend needs the receiver and the scheduler needs the backend, so the
//! registry is created first:
//!
//! ```ignore
//! let registry = AlarmRegistry::new();
//! let receiver = registry.tracking(Arc::new(MyReceiver));
//! let backend = TokioAlarmBackend::from_config(&config.alarm, receiver)?;
//! let scheduler = AlarmScheduler::new(Arc::new(backend), registry);
//! ```
//!
//! [`IAlarmBackend`]: bdaykeeper_core::ports::IAlarmBackend

pub mod registry;
pub mod scheduler;
pub mod tokio_backend;

pub use registry::{AlarmRegistry, TrackingReceiver};
pub use scheduler::{AlarmScheduler, Clock, ScheduleOutcome, SystemClock};
pub use tokio_backend::TokioAlarmBackend;
