//! Daemon service
//!
//! Composition root of the long-running host. Exposes the four operations
//! the outside world drives:
//!
//! - [`DaemonService::run_sync_pass`] - one cache refresh
//! - [`DaemonService::arm_notification`] - arm the birthday alarm
//! - [`DaemonService::cancel_notification`] - disarm it
//! - [`DaemonService::fetch_remote_config`] - refresh the cached remote config
//!
//! [`DaemonService::run`] performs the boot sequence and then drives the
//! periodic trigger until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use bdaykeeper_alarm::{AlarmScheduler, ScheduleOutcome};
use bdaykeeper_core::{
    config::Config,
    domain::{AlarmIdentity, AlarmState, RemoteId, ScheduleRequest},
    ports::{keys, AlarmReceiver, IConfigSource, IRemoteStore, ISettingsStore},
    usecases::{FetchRemoteConfigUseCase, LayeredConfigSource},
};
use bdaykeeper_sync::{
    engine::{PassOutcome, SyncEngine, SyncPass},
    trigger::{PeriodicTrigger, TriggerConfig, TriggerStats},
};
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ============================================================================
// Notification receiver
// ============================================================================

/// Fixed receiver of the birthday alarm
///
/// Rendering a desktop notification is left to the session; the daemon
/// reports the delivery in its log.
pub struct NotificationReceiver;

impl AlarmReceiver for NotificationReceiver {
    fn on_alarm(&self, request: &ScheduleRequest) {
        info!(
            identity = %request.identity,
            fire_at = %request.fire_at(),
            "Birthday notification is due"
        );
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the sync engine, the alarm scheduler and the layered config
pub struct DaemonService {
    config_source: Arc<LayeredConfigSource>,
    settings: Arc<dyn ISettingsStore>,
    engine: Arc<SyncEngine>,
    remote_config: FetchRemoteConfigUseCase,
    scheduler: AlarmScheduler,
}

impl DaemonService {
    pub fn new(
        config: Config,
        remote_store: Arc<dyn IRemoteStore>,
        settings: Arc<dyn ISettingsStore>,
        scheduler: AlarmScheduler,
    ) -> Self {
        let cache_dir = config.sync.cache_dir.clone();
        let document_name = config.drive.remote_config_file_name.clone();
        let config_source = Arc::new(LayeredConfigSource::new(config, Arc::clone(&settings)));

        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&remote_store),
            config_source.clone(),
            cache_dir,
        ));
        let remote_config =
            FetchRemoteConfigUseCase::new(remote_store, Arc::clone(&settings), document_name);

        Self {
            config_source,
            settings,
            engine,
            remote_config,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        self.config_source.config()
    }

    /// State of the birthday alarm
    pub fn notification_state(&self) -> AlarmState {
        self.scheduler.state(&AlarmIdentity::birthday())
    }

    /// Runs one sync pass
    pub async fn run_sync_pass(&self) -> PassOutcome {
        self.engine.run_pass().await
    }

    /// Arms the birthday alarm at `fire_at`
    ///
    /// A past instant is a no-op. When an alarm is armed its instant is
    /// recorded so a restart can re-arm it.
    pub fn arm_notification(&self, fire_at: DateTime<Utc>) -> Result<ScheduleOutcome> {
        let request = ScheduleRequest::new(AlarmIdentity::birthday(), fire_at);
        let outcome = self
            .scheduler
            .schedule(&request)
            .context("Failed to arm birthday notification")?;

        if let ScheduleOutcome::Armed(_) = outcome {
            self.settings
                .set(
                    keys::NOTIFICATION_SCHEDULED_AT,
                    request.fire_at_epoch_millis.to_string(),
                )
                .context("Failed to record scheduled notification")?;
        }
        Ok(outcome)
    }

    /// Disarms the birthday alarm and forgets the recorded instant
    pub fn cancel_notification(&self) -> Result<()> {
        self.scheduler.cancel(&AlarmIdentity::birthday());
        self.settings
            .remove_many(&[keys::NOTIFICATION_SCHEDULED_AT])
            .context("Failed to clear scheduled notification")?;
        Ok(())
    }

    /// Refreshes the cached remote configuration from `folder_id`
    ///
    /// Returns true when a valid document was obtained. Never fails.
    pub async fn fetch_remote_config(&self, folder_id: &RemoteId) -> bool {
        self.remote_config.execute(folder_id).await
    }

    /// Boot sequence: best-effort remote config refresh, then re-arm
    ///
    /// The instant comes from the layered config. If it cannot be resolved,
    /// the instant recorded by the last successful arm is used instead.
    pub async fn boot(&self) -> Result<ScheduleOutcome> {
        match self.config_source.folder_id() {
            Ok(Some(folder_id)) => {
                let fetched = self.fetch_remote_config(&folder_id).await;
                info!(folder = %folder_id, fetched, "Boot remote configuration check");
            }
            Ok(None) => info!("No target folder configured, skipping remote configuration"),
            Err(e) => warn!(error = %format!("{e:#}"), "Cannot resolve target folder"),
        }

        let fire_at = match self.config_source.target_settings() {
            Ok(settings) => settings.fire_at,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Cannot resolve notification instant");
                self.recorded_instant()?
                    .context("No notification instant configured or recorded")?
            }
        };

        self.arm_notification(fire_at)
    }

    /// Boots and drives the periodic trigger until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) -> TriggerStats {
        match self.boot().await {
            Ok(ScheduleOutcome::Armed(precision)) => {
                info!(precision = ?precision, "Birthday notification armed")
            }
            Ok(ScheduleOutcome::Skipped) => info!("Birthday instant has passed, nothing to arm"),
            Err(e) => warn!(error = %format!("{e:#}"), "Birthday notification not armed"),
        }

        let trigger = PeriodicTrigger::new(
            self.engine.clone(),
            TriggerConfig::from_config(self.config()),
        );
        trigger.run(shutdown).await
    }

    fn recorded_instant(&self) -> Result<Option<DateTime<Utc>>> {
        let millis = self
            .settings
            .get_i64(keys::NOTIFICATION_SCHEDULED_AT)
            .context("Failed to read scheduled notification")?;
        Ok(millis.and_then(|m| Utc.timestamp_millis_opt(m).single()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bdaykeeper_alarm::AlarmRegistry;
    use bdaykeeper_core::{
        config::ConfigBuilder,
        domain::{AlarmPrecision, BirthdayTarget, FileMetadata},
        ports::{AlarmError, ByteStream, IAlarmBackend, MemorySettingsStore, Ready, RemoteStoreError},
    };
    use bytes::Bytes;
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    // ------------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct FolderStore {
        files: Vec<(FileMetadata, &'static str)>,
    }

    impl FolderStore {
        fn with(mut self, id: &str, name: &str, body: &'static str) -> Self {
            self.files.push((
                FileMetadata {
                    id: RemoteId::new(id).unwrap(),
                    name: name.to_string(),
                    mime_type: "application/json".to_string(),
                    size_bytes: body.len() as u64,
                    modified_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                },
                body,
            ));
            self
        }
    }

    #[async_trait]
    impl IRemoteStore for FolderStore {
        async fn initialize(&self) -> Result<Ready, RemoteStoreError> {
            Ok(Ready)
        }

        async fn list_files_in_folder(
            &self,
            _folder_id: &RemoteId,
        ) -> Result<Vec<FileMetadata>, RemoteStoreError> {
            Ok(self.files.iter().map(|(m, _)| m.clone()).collect())
        }

        async fn get_file_info(&self, file_id: &RemoteId) -> Result<FileMetadata, RemoteStoreError> {
            self.files
                .iter()
                .find(|(m, _)| &m.id == file_id)
                .map(|(m, _)| m.clone())
                .ok_or(RemoteStoreError::Api {
                    status: 404,
                    message: "not found".into(),
                })
        }

        async fn download_file(&self, file_id: &RemoteId) -> Result<ByteStream, RemoteStoreError> {
            let body = self
                .files
                .iter()
                .find(|(m, _)| &m.id == file_id)
                .map(|(_, b)| *b)
                .unwrap_or_default();
            Ok(Box::pin(futures_util::stream::iter(vec![Ok(
                Bytes::from_static(body.as_bytes()),
            )])))
        }
    }

    #[derive(Default)]
    struct MemoryAlarms {
        armed: Mutex<Vec<ScheduleRequest>>,
    }

    impl IAlarmBackend for MemoryAlarms {
        fn can_schedule_exact(&self) -> bool {
            true
        }

        fn set_exact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
            let mut armed = self.armed.lock().unwrap();
            armed.retain(|r| r.identity != request.identity);
            armed.push(request.clone());
            Ok(())
        }

        fn set_inexact(&self, request: &ScheduleRequest) -> Result<(), AlarmError> {
            self.set_exact(request)
        }

        fn cancel(&self, identity: &AlarmIdentity) {
            self.armed.lock().unwrap().retain(|r| &r.identity != identity);
        }
    }

    struct Fixture {
        service: DaemonService,
        settings: Arc<MemorySettingsStore>,
        alarms: Arc<MemoryAlarms>,
        _dir: TempDir,
    }

    fn fixture(store: FolderStore, birthday: BirthdayTarget) -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = ConfigBuilder::new()
            .target_folder_id("folder-1")
            .target_birthday(birthday)
            .sync_cache_dir(dir.path().to_path_buf())
            .build();
        let settings = Arc::new(MemorySettingsStore::default());
        let alarms = Arc::new(MemoryAlarms::default());
        let scheduler = AlarmScheduler::new(alarms.clone(), AlarmRegistry::new());

        Fixture {
            service: DaemonService::new(config, Arc::new(store), settings.clone(), scheduler),
            settings,
            alarms,
            _dir: dir,
        }
    }

    fn future_birthday() -> BirthdayTarget {
        BirthdayTarget {
            year: 2099,
            month: 3,
            day: 14,
            hour: 9,
            minute: 30,
        }
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_arm_records_instant() {
        let f = fixture(FolderStore::default(), future_birthday());
        let at = Utc::now() + Duration::hours(3);

        let outcome = f.service.arm_notification(at).unwrap();

        assert_eq!(outcome, ScheduleOutcome::Armed(AlarmPrecision::Exact));
        assert_eq!(
            f.settings.get_i64(keys::NOTIFICATION_SCHEDULED_AT).unwrap(),
            Some(at.timestamp_millis())
        );
        assert!(f.service.notification_state().is_armed());
    }

    #[tokio::test]
    async fn test_arm_past_instant_records_nothing() {
        let f = fixture(FolderStore::default(), future_birthday());

        let outcome = f.service.arm_notification(Utc::now() - Duration::days(2)).unwrap();

        assert_eq!(outcome, ScheduleOutcome::Skipped);
        assert_eq!(f.settings.get(keys::NOTIFICATION_SCHEDULED_AT).unwrap(), None);
        assert!(f.alarms.armed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_clears_alarm_and_record() {
        let f = fixture(FolderStore::default(), future_birthday());
        f.service.arm_notification(Utc::now() + Duration::hours(1)).unwrap();

        f.service.cancel_notification().unwrap();

        assert!(f.alarms.armed.lock().unwrap().is_empty());
        assert_eq!(f.settings.get(keys::NOTIFICATION_SCHEDULED_AT).unwrap(), None);
        assert_eq!(f.service.notification_state(), AlarmState::Cancelled);
    }

    #[tokio::test]
    async fn test_boot_applies_remote_config_and_arms() {
        let doc = r#"{"version":2,"birthday_year":2098,"birthday_month":7,"birthday_day":1,
            "birthday_hour":10,"birthday_minute":0,"daylio_file_name":"x.daylio",
            "last_updated":1767225600000}"#;
        let store = FolderStore::default().with("cfg", "bdaykeeper_config.json", doc);
        let f = fixture(store, future_birthday());

        let outcome = f.service.boot().await.unwrap();

        assert!(matches!(outcome, ScheduleOutcome::Armed(_)));
        let expected = BirthdayTarget {
            year: 2098,
            month: 7,
            day: 1,
            hour: 10,
            minute: 0,
        }
        .fire_instant()
        .unwrap();
        let armed = f.alarms.armed.lock().unwrap().clone();
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].fire_at(), expected);
    }

    #[tokio::test]
    async fn test_boot_with_malformed_remote_config_uses_bundled_target() {
        let store = FolderStore::default().with("cfg", "bdaykeeper_config.json", r#"{"version":2}"#);
        let f = fixture(store, future_birthday());

        f.service.boot().await.unwrap();

        let armed = f.alarms.armed.lock().unwrap().clone();
        assert_eq!(armed[0].fire_at(), future_birthday().fire_instant().unwrap());
        assert_eq!(f.settings.get(keys::REMOTE_VERSION).unwrap(), None);
    }

    #[tokio::test]
    async fn test_boot_after_birthday_skips() {
        let past = BirthdayTarget {
            year: 2001,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
        };
        let f = fixture(FolderStore::default(), past);

        assert_eq!(f.service.boot().await.unwrap(), ScheduleOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_fetch_remote_config_reports_false_on_missing_document() {
        let f = fixture(FolderStore::default(), future_birthday());
        assert!(!f.service.fetch_remote_config(&RemoteId::new("folder-1").unwrap()).await);
    }

    #[tokio::test]
    async fn test_run_sync_pass_fetches_cache() {
        let store = FolderStore::default().with("f1", "backup.daylio", "entries");
        let f = fixture(store, future_birthday());

        match f.service.run_sync_pass().await {
            PassOutcome::Success(report) => {
                assert_eq!(report.bytes_written, 7);
                assert_eq!(std::fs::read(&report.cache_path).unwrap(), b"entries");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let f = fixture(FolderStore::default(), future_birthday());
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            token.cancel();
        });

        let stats = f.service.run(shutdown).await;

        assert_eq!(stats.passes, 1);
        assert!(f.service.notification_state().is_armed());
    }
}
