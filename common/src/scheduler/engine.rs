// Reminder engine: owns medication schedules, fires de-duplicated daily
// alerts from a polling loop and keeps the bounded intake log.

use super::regimens::{EXAMPLE_REGIMENS, NEAR_TERM_OFFSETS_MINUTES};
use super::snapshot;
use crate::catalog::MedicineCatalog;
use crate::clock::{Clock, WallClockZone};
use crate::config::ReminderSettings;
use crate::errors::ScheduleError;
use crate::models::{
    AlertKey, AlertPayload, IntakeLogEntry, MedicationSchedule, MinuteOfDay, UpcomingMedication,
};
use crate::storage::{KeyValueStore, STORAGE_KEY};
use crate::telemetry;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Default number of entries returned by [`ReminderEngine::medication_log`]
pub const DEFAULT_LOG_LIMIT: usize = 20;

/// Alert subscriber. Errors and panics are logged and do not stop delivery
/// to the remaining subscribers.
pub type AlertCallback = Arc<dyn Fn(&AlertPayload) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as an [`AlertCallback`]
pub fn alert_callback<F>(f: F) -> AlertCallback
where
    F: Fn(&AlertPayload) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handle returned by [`ReminderEngine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Configuration for the reminder engine
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub check_interval: Duration,
    /// A schedule time matches when it is at most this many minutes from now
    pub tolerance_minutes: u16,
    pub max_log_entries: usize,
    pub snooze: Duration,
    pub seed_examples: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            tolerance_minutes: 1,
            max_log_entries: 100,
            snooze: Duration::from_secs(5 * 60),
            seed_examples: true,
        }
    }
}

impl From<&ReminderSettings> for ReminderConfig {
    fn from(settings: &ReminderSettings) -> Self {
        Self {
            check_interval: Duration::from_secs(settings.check_interval_seconds),
            tolerance_minutes: settings.tolerance_minutes,
            max_log_entries: settings.max_log_entries,
            snooze: Duration::from_secs(settings.snooze_minutes * 60),
            seed_examples: settings.seed_examples,
        }
    }
}

#[derive(Default)]
struct EngineState {
    schedules: BTreeMap<String, MedicationSchedule>,
    /// Fired and not yet acted on
    active_alerts: HashMap<AlertKey, AlertPayload>,
    /// Reminders the user already logged as taken; never fire again that day
    acknowledged: HashSet<AlertKey>,
    /// Newest first
    log: VecDeque<IntakeLogEntry>,
}

impl EngineState {
    /// Keys only ever match the current date, so anything older is dead weight
    fn prune_before(&mut self, today: NaiveDate) {
        self.active_alerts.retain(|key, _| key.date >= today);
        self.acknowledged.retain(|key| key.date >= today);
    }

    fn enabled_schedule_count(&self) -> usize {
        self.schedules.values().filter(|s| s.enabled).count()
    }
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, AlertCallback)>,
}

/// Main reminder engine implementation
pub struct ReminderEngine {
    config: ReminderConfig,
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<dyn MedicineCatalog>,
    clock: Arc<dyn Clock>,
    zone: WallClockZone,
    state: Mutex<EngineState>,
    subscribers: Mutex<Subscribers>,
    shutdown_tx: broadcast::Sender<()>,
    stopped: AtomicBool,
}

impl ReminderEngine {
    /// Create a new engine with empty state. Call [`initialize`](Self::initialize)
    /// to load persisted schedules.
    pub fn new(
        config: ReminderConfig,
        store: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn MedicineCatalog>,
        clock: Arc<dyn Clock>,
        zone: WallClockZone,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Self {
            config,
            store,
            catalog,
            clock,
            zone,
            state: Mutex::new(EngineState::default()),
            subscribers: Mutex::new(Subscribers::default()),
            shutdown_tx,
            stopped: AtomicBool::new(false),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wall_minute_and_date(&self, now: DateTime<Utc>) -> (MinuteOfDay, NaiveDate) {
        let wall = self.zone.wall_time(now);
        (MinuteOfDay::from_time(&wall.time()), wall.date())
    }

    /// Load persisted state and, when enabled and nothing was stored, seed
    /// example schedules from the catalog
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        self.load_from_storage();

        if self.config.seed_examples {
            self.seed_example_schedules().await;
        }

        info!(
            schedules = self.lock_state().schedules.len(),
            "Reminder engine initialized"
        );
    }

    fn load_from_storage(&self) {
        let stored = match self.store.get(STORAGE_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!("No stored reminder state");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read reminder state from storage");
                telemetry::record_persistence_failure("load");
                return;
            }
        };

        match snapshot::decode(&stored) {
            Ok(persisted) => {
                let mut state = self.lock_state();
                state.schedules = persisted.schedules.into_iter().collect();
                state.log = persisted.logs.into_iter().collect();
                state.log.truncate(self.config.max_log_entries);
                telemetry::update_active_schedules(state.enabled_schedule_count());
                info!(
                    schedules = state.schedules.len(),
                    log_entries = state.log.len(),
                    "Reminder state loaded from storage"
                );
            }
            Err(e) => {
                warn!(error = %e, "Stored reminder state is unreadable, starting empty");
                telemetry::record_persistence_failure("load");
            }
        }
    }

    /// Write the current state. Failures are logged; memory stays authoritative.
    fn persist(&self, state: &EngineState) {
        let result = snapshot::encode(&state.schedules, &state.log)
            .and_then(|json| self.store.set(STORAGE_KEY, &json));

        if let Err(e) = result {
            error!(error = %e, "Failed to save reminder state");
            telemetry::record_persistence_failure("save");
        }
    }

    /// Give the first catalog medicines the built-in demo regimens.
    ///
    /// Returns the number of schedules created; zero when schedules already
    /// exist or the catalog is empty or unreachable.
    #[instrument(skip(self))]
    pub async fn seed_example_schedules(&self) -> usize {
        if !self.lock_state().schedules.is_empty() {
            debug!("Existing schedules found, skipping example setup");
            return 0;
        }

        let medicines = match self.catalog.list_medicines().await {
            Ok(medicines) => medicines,
            Err(e) => {
                warn!(error = %e, "Medicine catalog unavailable, skipping example setup");
                return 0;
            }
        };
        if medicines.is_empty() {
            warn!("No medicines available to set up example schedules");
            return 0;
        }

        let now = self.clock.now();
        let near_term: Vec<MinuteOfDay> = NEAR_TERM_OFFSETS_MINUTES
            .iter()
            .map(|offset| {
                let wall = self.zone.wall_time(now + ChronoDuration::minutes(*offset));
                MinuteOfDay::from_time(&wall.time())
            })
            .collect();

        let mut seeded = 0;
        for (index, (medicine, (template, description))) in
            medicines.iter().zip(EXAMPLE_REGIMENS.iter()).enumerate()
        {
            // Templates are compile-time constants covered by a unit test
            let mut times: BTreeSet<MinuteOfDay> =
                template.iter().filter_map(|t| t.parse().ok()).collect();
            if let Some(extra) = near_term.get(index) {
                times.insert(*extra);
            }

            let schedule = self.install_schedule(
                &medicine.id,
                &medicine.name,
                &medicine.dosage,
                times,
                now,
            );
            info!(
                medicine_id = %schedule.medicine_id,
                medicine_name = %schedule.medicine_name,
                times = %format_times(&schedule.times),
                description = *description,
                "Example schedule set"
            );
            seeded += 1;
        }

        seeded
    }

    /// Create or wholesale replace the schedule for a medicine.
    ///
    /// Every time string is validated first; on error nothing changes.
    #[instrument(skip(self, times), fields(medicine_id = %medicine_id))]
    pub fn set_schedule(
        &self,
        medicine_id: &str,
        medicine_name: &str,
        times: &[&str],
        dosage: &str,
    ) -> Result<MedicationSchedule, ScheduleError> {
        let times = times
            .iter()
            .map(|t| t.parse::<MinuteOfDay>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        let schedule =
            self.install_schedule(medicine_id, medicine_name, dosage, times, self.clock.now());
        info!(
            medicine_name = %schedule.medicine_name,
            times = %format_times(&schedule.times),
            "Schedule set"
        );
        Ok(schedule)
    }

    fn install_schedule(
        &self,
        medicine_id: &str,
        medicine_name: &str,
        dosage: &str,
        times: BTreeSet<MinuteOfDay>,
        created_at: DateTime<Utc>,
    ) -> MedicationSchedule {
        let schedule = MedicationSchedule {
            medicine_id: medicine_id.to_string(),
            medicine_name: medicine_name.to_string(),
            dosage: dosage.to_string(),
            times,
            enabled: true,
            created_at,
        };

        let mut state = self.lock_state();
        state
            .schedules
            .insert(medicine_id.to_string(), schedule.clone());
        self.persist(&state);
        telemetry::update_active_schedules(state.enabled_schedule_count());

        schedule
    }

    /// Enable or disable a schedule. Returns `false` when no schedule exists.
    #[instrument(skip(self))]
    pub fn toggle_schedule(&self, medicine_id: &str, enabled: bool) -> bool {
        let mut state = self.lock_state();
        let Some(schedule) = state.schedules.get_mut(medicine_id) else {
            debug!("No schedule to toggle");
            return false;
        };
        schedule.enabled = enabled;

        self.persist(&state);
        telemetry::update_active_schedules(state.enabled_schedule_count());
        info!(enabled, "Schedule toggled");
        true
    }

    #[instrument(skip(self))]
    pub fn remove_schedule(&self, medicine_id: &str) -> Option<MedicationSchedule> {
        let mut state = self.lock_state();
        let removed = state.schedules.remove(medicine_id);

        self.persist(&state);
        telemetry::update_active_schedules(state.enabled_schedule_count());
        if removed.is_some() {
            info!("Schedule removed");
        }
        removed
    }

    /// Fire every reminder that is due now and has not fired today.
    ///
    /// A time is due when it lies within `tolerance_minutes` of the current
    /// wall-clock minute. Reminders are marked before subscribers run, so
    /// calling this again (from the loop, on demand or from inside a
    /// callback) never fires the same reminder twice on one day. A loop
    /// stalled past the whole window skips that reminder for the day.
    #[instrument(skip(self))]
    pub fn check_for_alerts(&self) -> Vec<AlertPayload> {
        let now = self.clock.now();
        let (current, today) = self.wall_minute_and_date(now);

        let fired: Vec<AlertPayload> = {
            let mut state = self.lock_state();
            state.prune_before(today);

            let mut due = Vec::new();
            for schedule in state.schedules.values().filter(|s| s.enabled) {
                for &time in &schedule.times {
                    if time.distance(current) > self.config.tolerance_minutes {
                        continue;
                    }
                    let key = AlertKey::new(&schedule.medicine_id, time, today);
                    if state.active_alerts.contains_key(&key) || state.acknowledged.contains(&key)
                    {
                        continue;
                    }
                    let payload = AlertPayload::for_schedule(&key, schedule, now);
                    due.push((key, payload));
                }
            }

            due.into_iter()
                .map(|(key, payload)| {
                    state.active_alerts.insert(key, payload.clone());
                    payload
                })
                .collect()
        };

        for alert in &fired {
            info!(
                alert_id = %alert.id,
                medicine_id = %alert.medicine_id,
                medicine_name = %alert.medicine_name,
                scheduled_time = %alert.scheduled_time,
                "Medication alert triggered"
            );
            telemetry::record_alert_fired(&alert.medicine_id);
            self.dispatch(alert);
        }

        fired
    }

    /// Invoke every subscriber with `alert`, isolating failures.
    ///
    /// Callbacks run without any engine lock held.
    fn dispatch(&self, alert: &AlertPayload) -> usize {
        let callbacks: Vec<(SubscriptionId, AlertCallback)> = self
            .lock_subscribers()
            .callbacks
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(alert))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    warn!(subscription = id.0, alert_id = %alert.id, error = %e, "Error in alert callback");
                    telemetry::record_callback_failure();
                }
                Err(_) => {
                    warn!(subscription = id.0, alert_id = %alert.id, "Alert callback panicked");
                    telemetry::record_callback_failure();
                }
            }
        }
        delivered
    }

    /// Record that a medicine was taken.
    ///
    /// With `scheduled_time`, the matching reminder for today is cleared from
    /// the active alerts and will not fire again today.
    #[instrument(skip(self, medicine_name, dosage), fields(medicine_id = %medicine_id))]
    pub fn log_taken(
        &self,
        medicine_id: &str,
        medicine_name: &str,
        dosage: &str,
        scheduled_time: Option<&str>,
    ) -> Result<IntakeLogEntry, ScheduleError> {
        let scheduled = scheduled_time
            .map(str::parse::<MinuteOfDay>)
            .transpose()?;

        let now = self.clock.now();
        let entry = IntakeLogEntry {
            id: Uuid::now_v7(),
            medicine_id: medicine_id.to_string(),
            medicine_name: medicine_name.to_string(),
            dosage: dosage.to_string(),
            scheduled_time: scheduled,
            taken_at: now,
        };

        let mut state = self.lock_state();
        state.log.push_front(entry.clone());
        state.log.truncate(self.config.max_log_entries);
        self.persist(&state);

        if let Some(time) = scheduled {
            let (_, today) = self.wall_minute_and_date(now);
            let key = AlertKey::new(medicine_id, time, today);
            state.active_alerts.remove(&key);
            state.acknowledged.insert(key);
        }
        drop(state);

        telemetry::record_intake_logged(scheduled.is_some());
        info!(
            entry_id = %entry.id,
            scheduled_time = ?entry.scheduled_time.map(|t| t.to_string()),
            "Medication logged"
        );
        Ok(entry)
    }

    /// Enabled reminders still ahead today, earliest first.
    ///
    /// Times already passed today are left out rather than rolled over to
    /// tomorrow.
    pub fn upcoming_medications(&self) -> Vec<UpcomingMedication> {
        let (current, _) = self.wall_minute_and_date(self.clock.now());
        let state = self.lock_state();

        let mut upcoming: Vec<UpcomingMedication> = state
            .schedules
            .values()
            .filter(|s| s.enabled)
            .flat_map(|s| {
                s.times
                    .iter()
                    .filter(|time| **time > current)
                    .map(move |time| UpcomingMedication {
                        medicine_id: s.medicine_id.clone(),
                        medicine_name: s.medicine_name.clone(),
                        dosage: s.dosage.clone(),
                        time: *time,
                    })
            })
            .collect();

        // Stable: equal times keep medicine id order
        upcoming.sort_by_key(|u| u.time);
        upcoming
    }

    pub fn medication_schedules(&self) -> Vec<MedicationSchedule> {
        self.lock_state().schedules.values().cloned().collect()
    }

    pub fn schedule(&self, medicine_id: &str) -> Option<MedicationSchedule> {
        self.lock_state().schedules.get(medicine_id).cloned()
    }

    /// Most recent intake entries, newest first
    pub fn medication_log(&self, limit: usize) -> Vec<IntakeLogEntry> {
        self.lock_state().log.iter().take(limit).cloned().collect()
    }

    /// Alerts fired and not yet logged as taken
    pub fn active_alerts(&self) -> Vec<AlertPayload> {
        let mut alerts: Vec<AlertPayload> =
            self.lock_state().active_alerts.values().cloned().collect();
        alerts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    pub fn subscribe(&self, callback: AlertCallback) -> SubscriptionId {
        let mut subscribers = self.lock_subscribers();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.callbacks.push((id, callback));
        debug!(subscription = id.0, "Alert subscriber added");
        id
    }

    /// Returns `false` when the subscription was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.callbacks.len();
        subscribers.callbacks.retain(|(existing, _)| *existing != id);
        before != subscribers.callbacks.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().callbacks.len()
    }

    /// Send an immediate alert for the first catalog medicine.
    ///
    /// Bypasses schedules and de-duplication; nothing is recorded.
    #[instrument(skip(self))]
    pub async fn trigger_test_alert(&self) -> Option<AlertPayload> {
        let medicine = match self.catalog.list_medicines().await {
            Ok(medicines) => medicines.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "Medicine catalog unavailable for test alert");
                None
            }
        };
        let Some(medicine) = medicine else {
            warn!("No medicines available for test alert");
            return None;
        };

        let now = self.clock.now();
        let (current, _) = self.wall_minute_and_date(now);
        let alert = AlertPayload {
            id: format!("test-alert-{}", now.timestamp_millis()),
            medicine_id: medicine.id,
            medicine_name: medicine.name,
            dosage: medicine.dosage,
            scheduled_time: current,
            timestamp: now,
        };

        let delivered = self.dispatch(&alert);
        info!(alert_id = %alert.id, delivered, "Test alert triggered");
        Some(alert)
    }

    /// Re-deliver `alert` after the configured snooze delay.
    ///
    /// The repeat carries a fresh id and the current minute, and is dropped
    /// if the medicine no longer has a schedule by then. Shutdown cancels it.
    pub fn snooze(self: &Arc<Self>, alert: &AlertPayload) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let alert = alert.clone();
        let delay = self.config.snooze;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(alert_id = %alert.id, delay_seconds = delay.as_secs(), "Reminder snoozed");

        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(delay) => {
                    if engine.is_shut_down() {
                        return;
                    }
                    if engine.schedule(&alert.medicine_id).is_none() {
                        debug!(alert_id = %alert.id, "Schedule removed, dropping snoozed alert");
                        return;
                    }

                    let now = engine.clock.now();
                    let (current, _) = engine.wall_minute_and_date(now);
                    let repeat = AlertPayload {
                        id: format!("{}-snooze-{}", alert.id, now.timestamp_millis()),
                        scheduled_time: current,
                        timestamp: now,
                        ..alert
                    };
                    info!(alert_id = %repeat.id, "Snoozed alert due");
                    engine.dispatch(&repeat);
                }
                _ = shutdown_rx.recv() => {
                    debug!(alert_id = %alert.id, "Snooze cancelled by shutdown");
                }
            }
        })
    }

    /// Run the polling loop until [`shutdown`](Self::shutdown).
    ///
    /// The first check happens immediately.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.is_shut_down() {
            warn!("Reminder engine already shut down, not starting");
            return;
        }

        info!(
            check_interval_seconds = self.config.check_interval.as_secs(),
            tolerance_minutes = self.config.tolerance_minutes,
            "Starting reminder polling loop"
        );

        let mut ticker = interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let fired = self.check_for_alerts();
                    if fired.is_empty() {
                        debug!("No reminders due");
                    } else {
                        debug!(fired = fired.len(), "Reminders fired");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping reminder loop");
                    break;
                }
            }
        }

        info!("Reminder polling loop stopped");
    }

    /// Stop the polling loop and pending snoozes and drop all subscribers.
    ///
    /// Schedules and the intake log are kept.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        self.lock_subscribers().callbacks.clear();
        info!("Reminder engine shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Wipe schedules, alerts, the log and the stored blob
    #[instrument(skip(self))]
    pub fn clear_all_data(&self) {
        let mut state = self.lock_state();
        *state = EngineState::default();
        if let Err(e) = self.store.remove(STORAGE_KEY) {
            error!(error = %e, "Failed to clear stored reminder state");
            telemetry::record_persistence_failure("clear");
        }
        telemetry::update_active_schedules(0);
        info!("All medication data cleared");
    }
}

fn format_times(times: &BTreeSet<MinuteOfDay>) -> String {
    times
        .iter()
        .map(MinuteOfDay::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn engine_at(hour: u32, minute: u32) -> (ReminderEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap(),
        ));
        let engine = ReminderEngine::new(
            ReminderConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(StaticCatalog::demo()),
            clock.clone(),
            WallClockZone::Named(chrono_tz::Tz::UTC),
        );
        (engine, clock)
    }

    #[test]
    fn test_reminder_config_default() {
        let config = ReminderConfig::default();
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.tolerance_minutes, 1);
        assert_eq!(config.max_log_entries, 100);
        assert_eq!(config.snooze, Duration::from_secs(300));
    }

    #[test]
    fn test_reminder_config_from_settings() {
        let settings = ReminderSettings {
            check_interval_seconds: 10,
            tolerance_minutes: 2,
            max_log_entries: 50,
            snooze_minutes: 1,
            seed_examples: false,
            timezone: None,
        };
        let config = ReminderConfig::from(&settings);
        assert_eq!(config.check_interval, Duration::from_secs(10));
        assert_eq!(config.snooze, Duration::from_secs(60));
        assert!(!config.seed_examples);
    }

    #[test]
    fn test_set_schedule_dedups_and_sorts_times() {
        let (engine, _) = engine_at(6, 0);
        let schedule = engine
            .set_schedule("22", "Amoxicillin", &["20:00", "08:00", "08:00"], "500mg")
            .unwrap();
        assert_eq!(format_times(&schedule.times), "08:00, 20:00");
        assert!(schedule.enabled);
    }

    #[test]
    fn test_set_schedule_rejects_bad_time_without_changes() {
        let (engine, _) = engine_at(6, 0);
        engine
            .set_schedule("22", "Amoxicillin", &["08:00"], "500mg")
            .unwrap();
        let result = engine.set_schedule("22", "Amoxicillin", &["09:00", "9am"], "500mg");
        assert!(matches!(result, Err(ScheduleError::InvalidTime { .. })));
        let kept = engine.schedule("22").unwrap();
        assert_eq!(format_times(&kept.times), "08:00");
    }

    #[test]
    fn test_alert_fires_within_tolerance_window() {
        let (engine, clock) = engine_at(7, 59);
        engine.set_schedule("11", "Aspirin", &["08:00"], "75mg").unwrap();
        let fired = engine.check_for_alerts();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, "11-480-2024-03-01");
        assert_eq!(fired[0].scheduled_time.to_string(), "08:00");

        clock.advance(ChronoDuration::minutes(2));
        assert!(engine.check_for_alerts().is_empty());
    }

    #[test]
    fn test_alert_outside_window_does_not_fire() {
        let (engine, _) = engine_at(7, 58);
        engine.set_schedule("11", "Aspirin", &["08:00"], "75mg").unwrap();
        assert!(engine.check_for_alerts().is_empty());
    }

    #[test]
    fn test_stale_alerts_are_pruned_on_new_day() {
        let (engine, clock) = engine_at(8, 0);
        engine.set_schedule("11", "Aspirin", &["08:00"], "75mg").unwrap();
        assert_eq!(engine.check_for_alerts().len(), 1);
        assert_eq!(engine.active_alerts().len(), 1);

        clock.advance(ChronoDuration::hours(12));
        assert!(engine.check_for_alerts().is_empty());
        assert_eq!(engine.active_alerts().len(), 1);

        clock.advance(ChronoDuration::hours(12));
        let fired = engine.check_for_alerts();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, "11-480-2024-03-02");

        let active = engine.active_alerts();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "11-480-2024-03-02");
    }

    #[test]
    fn test_callback_may_reenter_engine() {
        let (engine, _) = engine_at(8, 0);
        let engine = Arc::new(engine);
        engine.set_schedule("11", "Aspirin", &["08:00"], "75mg").unwrap();

        let weak = Arc::downgrade(&engine);
        engine.subscribe(alert_callback(move |alert| {
            let engine = weak.upgrade().ok_or_else(|| anyhow::anyhow!("engine dropped"))?;
            assert!(engine.check_for_alerts().is_empty());
            engine.log_taken(
                &alert.medicine_id,
                &alert.medicine_name,
                &alert.dosage,
                Some(alert.scheduled_time.to_string().as_str()),
            )?;
            Ok(())
        }));

        assert_eq!(engine.check_for_alerts().len(), 1);
        assert_eq!(engine.medication_log(DEFAULT_LOG_LIMIT).len(), 1);
        assert!(engine.active_alerts().is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let (engine, _) = engine_at(8, 0);
        let id = engine.subscribe(alert_callback(|_| Ok(())));
        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
    }

    #[test]
    fn test_clear_all_data() {
        let (engine, _) = engine_at(8, 0);
        engine.set_schedule("11", "Aspirin", &["08:00"], "75mg").unwrap();
        engine.log_taken("11", "Aspirin", "75mg", None).unwrap();
        engine.clear_all_data();
        assert!(engine.medication_schedules().is_empty());
        assert!(engine.medication_log(DEFAULT_LOG_LIMIT).is_empty());
    }
}
