//! The monitoring state machine
//!
//! `MonitorEngine` owns the whole poll pipeline: business-hours gating,
//! session upkeep, scraping, change detection, classification,
//! persistence, and notification dispatch. The daemon drives it from a
//! coarse tick timer and translates the events it returns into IPC
//! broadcasts.
//!
//! Every failure is absorbed here: a bad cycle logs, emits an event, and
//! leaves the schedule running.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tickwatch_api::{MonitorSnapshot, MonitorState, Settings, API_VERSION};
use tickwatch_host_api::{Notifier, PageDriver};
use tickwatch_store::{Store, StoreError};
use tickwatch_util::MonotonicInstant;
use tracing::{debug, info, warn};

use crate::classify;
use crate::diff::diff;
use crate::dispatch::{NotificationDispatcher, DEFAULT_NOTIFICATION_TTL};
use crate::scrape::{ScrapeTiming, Scraper};
use crate::session::{SessionManager, SessionTiming};
use crate::CoreEvent;

/// Why a start attempt was refused
#[derive(Debug, Error)]
pub enum StartError {
    #[error("모니터링 설정이 없습니다")]
    MissingSettings,

    #[error("체크 주기가 올바르지 않습니다: {0}분")]
    InvalidInterval(u32),

    #[error("{0}")]
    Auth(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Engine timing knobs
#[derive(Debug, Clone, Copy)]
pub struct MonitorTiming {
    /// Forced session recheck cadence; kept shorter than the portal's
    /// own session timeout
    pub session_recheck: Duration,
    /// Live notification handle TTL
    pub notification_ttl: Duration,
    pub session: SessionTiming,
    pub scrape: ScrapeTiming,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self {
            session_recheck: Duration::from_secs(45 * 60),
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            session: SessionTiming::default(),
            scrape: ScrapeTiming::default(),
        }
    }
}

/// Outcome of one poll cycle
#[derive(Debug, Default)]
pub struct PollReport {
    pub events: Vec<CoreEvent>,
    pub added: usize,
    pub status_changed: usize,
    /// The cycle was skipped because another one was still in flight
    pub skipped: bool,
}

/// The monitoring scheduler and poll pipeline
pub struct MonitorEngine {
    store: Arc<dyn Store>,
    session: SessionManager,
    scraper: Scraper,
    dispatcher: NotificationDispatcher,
    timing: MonitorTiming,

    state: MonitorState,
    next_poll_due: Option<MonotonicInstant>,
    session_recheck_due: Option<MonotonicInstant>,
    poll_in_flight: bool,
}

impl MonitorEngine {
    /// Create the engine. If the paused marker is set from a previous
    /// run, monitoring resumes automatically once business hours begin.
    pub fn new(
        store: Arc<dyn Store>,
        driver: Arc<dyn PageDriver>,
        notifier: Arc<dyn Notifier>,
        timing: MonitorTiming,
    ) -> Self {
        let state = match store.is_paused() {
            Ok(true) => {
                info!("Resuming in paused state from previous run");
                MonitorState::PausedForBusinessHours
            }
            Ok(false) => MonitorState::Stopped,
            Err(e) => {
                warn!(error = %e, "Failed to read paused marker, starting stopped");
                MonitorState::Stopped
            }
        };

        Self {
            store,
            session: SessionManager::new(driver.clone(), timing.session),
            scraper: Scraper::new(driver, timing.scrape),
            dispatcher: NotificationDispatcher::new(notifier, timing.notification_ttl),
            timing,
            state,
            next_poll_due: None,
            session_recheck_due: None,
            poll_in_flight: false,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// Entry point for the UI's monitoring switch
    pub async fn toggle(
        &mut self,
        on: bool,
        now: chrono::DateTime<chrono::Local>,
        now_mono: MonotonicInstant,
    ) -> Result<Vec<CoreEvent>, StartError> {
        if on {
            self.start(now, now_mono).await
        } else {
            Ok(self.stop())
        }
    }

    /// Start monitoring.
    ///
    /// Requires settings with a valid interval and a working login. When
    /// the business-hours gate is closed, enters `PausedForBusinessHours`
    /// instead and lets the tick promote it once hours begin. Calling
    /// start while already running re-arms the schedule rather than
    /// double-scheduling.
    pub async fn start(
        &mut self,
        now: chrono::DateTime<chrono::Local>,
        now_mono: MonotonicInstant,
    ) -> Result<Vec<CoreEvent>, StartError> {
        let settings = self
            .store
            .load_settings()?
            .ok_or(StartError::MissingSettings)?;

        if settings.check_interval_minutes < 1 {
            return Err(StartError::InvalidInterval(settings.check_interval_minutes));
        }

        let was_monitoring = self.state.is_monitoring();
        let mut events = Vec::new();

        if settings.business_hours_only && !settings.business_hours.contains(&now) {
            info!("Outside business hours, starting paused");
            self.state = MonitorState::PausedForBusinessHours;
            self.next_poll_due = None;
            self.session_recheck_due = None;
            if let Err(e) = self.store.set_paused(true) {
                warn!(error = %e, "Failed to persist paused marker");
            }
            if !was_monitoring {
                events.push(CoreEvent::MonitoringChanged { monitoring: true });
            }
            events.push(CoreEvent::PauseStateChanged { paused: true });
            return Ok(events);
        }

        if let Err(e) = self.session.ensure_logged_in(&settings).await {
            // A failed start leaves the machine stopped; the user fixes
            // the settings and tries again
            self.state = MonitorState::Stopped;
            self.next_poll_due = None;
            self.session_recheck_due = None;
            return Err(StartError::Auth(e.to_string()));
        }

        self.state = MonitorState::Running;
        // First check runs on the next tick; re-arming (not stacking)
        // makes a repeated start harmless
        self.next_poll_due = Some(now_mono);
        self.session_recheck_due = Some(now_mono + self.timing.session_recheck);
        if let Err(e) = self.store.set_paused(false) {
            warn!(error = %e, "Failed to clear paused marker");
        }

        info!(
            interval_minutes = settings.check_interval_minutes,
            "Monitoring started"
        );

        if !was_monitoring {
            events.push(CoreEvent::MonitoringChanged { monitoring: true });
        }
        Ok(events)
    }

    /// Stop monitoring. Idempotent: stopping a stopped engine does
    /// nothing. The persisted alert set is left untouched.
    pub fn stop(&mut self) -> Vec<CoreEvent> {
        let was_monitoring = self.state.is_monitoring();

        self.state = MonitorState::Stopped;
        self.next_poll_due = None;
        self.session_recheck_due = None;
        if let Err(e) = self.store.set_paused(false) {
            warn!(error = %e, "Failed to clear paused marker");
        }

        if was_monitoring {
            info!("Monitoring stopped");
            vec![CoreEvent::MonitoringChanged { monitoring: false }]
        } else {
            Vec::new()
        }
    }

    /// One scheduler tick: reconcile the business-hours gate, keep the
    /// session fresh, run a poll when one is due, evict stale
    /// notification handles.
    pub async fn tick(
        &mut self,
        now: chrono::DateTime<chrono::Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        let settings = match self.store.load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to load settings during tick");
                return events;
            }
        };

        match self.state {
            MonitorState::Stopped => {}

            MonitorState::Running => {
                if let Some(settings) = &settings {
                    if settings.business_hours_only && !settings.business_hours.contains(&now) {
                        self.pause(&mut events);
                        self.dispatcher.evict_expired(now_mono);
                        return events;
                    }
                }

                // Forced session recheck, shorter than the portal's own
                // session timeout
                if self.deadline_due(self.session_recheck_due, now_mono) {
                    self.session_recheck_due = Some(now_mono + self.timing.session_recheck);
                    if let Some(settings) = &settings {
                        debug!("Forced session recheck");
                        self.session.invalidate();
                        if let Err(e) = self.session.ensure_logged_in(settings).await {
                            warn!(error = %e, "Session recheck failed");
                            events.push(CoreEvent::LoginError {
                                message: e.to_string(),
                            });
                        }
                    }
                }

                if self.deadline_due(self.next_poll_due, now_mono) {
                    let interval = settings
                        .as_ref()
                        .map(|s| s.check_interval_minutes)
                        .unwrap_or(Settings::default().check_interval_minutes);
                    self.next_poll_due =
                        Some(now_mono + Duration::from_secs(u64::from(interval) * 60));

                    let report = self.poll_now(now, now_mono).await;
                    events.extend(report.events);
                }
            }

            MonitorState::PausedForBusinessHours => {
                let gate_open = settings
                    .as_ref()
                    .map(|s| !s.business_hours_only || s.business_hours.contains(&now))
                    .unwrap_or(false);
                if gate_open {
                    self.resume(&mut events, now_mono);
                }
            }
        }

        self.dispatcher.evict_expired(now_mono);
        events
    }

    /// Run one poll cycle now, regardless of the schedule. Also serves
    /// the UI's manual-check command.
    pub async fn poll_now(
        &mut self,
        now: chrono::DateTime<chrono::Local>,
        now_mono: MonotonicInstant,
    ) -> PollReport {
        // Skip-if-busy: overlapping cycles are skipped, never queued
        if self.poll_in_flight {
            warn!("Poll already in flight, skipping this cycle");
            return PollReport {
                skipped: true,
                ..PollReport::default()
            };
        }

        self.poll_in_flight = true;
        let report = self.run_poll(now, now_mono).await;
        self.poll_in_flight = false;
        report
    }

    async fn run_poll(
        &mut self,
        now: chrono::DateTime<chrono::Local>,
        now_mono: MonotonicInstant,
    ) -> PollReport {
        let mut report = PollReport::default();

        let settings = match self.store.load_settings() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                warn!("Poll skipped: no settings");
                report.events.push(CoreEvent::ScrapingError {
                    message: "모니터링 설정이 없습니다".into(),
                });
                return report;
            }
            Err(e) => {
                warn!(error = %e, "Poll skipped: settings unreadable");
                report.events.push(CoreEvent::ScrapingError {
                    message: e.to_string(),
                });
                return report;
            }
        };

        // "Last attempted", not "last successful"
        if let Err(e) = self.store.set_last_checked(now) {
            warn!(error = %e, "Failed to record last-checked timestamp");
        }

        if let Err(e) = self.session.ensure_logged_in(&settings).await {
            warn!(error = %e, "Poll skipped: login failed");
            report.events.push(CoreEvent::LoginError {
                message: e.to_string(),
            });
            return report;
        }

        let scraped = match self.scraper.fetch(&settings).await {
            Ok(tickets) => tickets,
            Err(e) => {
                warn!(error = %e, "Scrape failed");
                if e.is_auth_suspect() {
                    // Grid landmark gone: the portal probably bounced us
                    // to the login screen, so re-login next cycle
                    self.session.invalidate();
                }
                report.events.push(CoreEvent::ScrapingError {
                    message: e.to_string(),
                });
                return report;
            }
        };

        let current = classify::sort(classify::annotate_all(scraped, now));

        let previous = match self.store.load_alerts() {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Failed to load previous alert set");
                report.events.push(CoreEvent::ScrapingError {
                    message: e.to_string(),
                });
                return report;
            }
        };

        // An empty previous set means this is the first poll ever (or
        // the set was cleared); persist but do not replay the portal's
        // whole history as notifications
        let first_run = previous.is_empty();

        let changes = diff(&previous, &current);
        report.added = changes.added.len();
        report.status_changed = changes.status_changed.len();

        if let Err(e) = self.store.replace_alerts(&current) {
            warn!(error = %e, "Failed to persist alert set");
            report.events.push(CoreEvent::ScrapingError {
                message: e.to_string(),
            });
            return report;
        }

        if previous != current {
            report.events.push(CoreEvent::AlertsUpdated {
                added: report.added,
                status_changed: report.status_changed,
            });
        }

        if first_run {
            if !changes.is_empty() {
                info!(
                    added = report.added,
                    "First poll: persisting without notifications"
                );
            }
        } else if !changes.is_empty() {
            let mut to_notify = changes.added;
            to_notify.extend(changes.status_changed);

            let shown = self
                .dispatcher
                .dispatch(&to_notify, settings.enable_notifications, now_mono)
                .await;
            debug!(
                added = report.added,
                status_changed = report.status_changed,
                shown,
                "Poll cycle complete"
            );
        }

        report
    }

    /// Drop the session and log in again (the UI's refresh-session
    /// command). Returns whether a session is live afterwards.
    pub async fn refresh_session(&mut self) -> Result<bool, StoreError> {
        self.session.invalidate();
        let Some(settings) = self.store.load_settings()? else {
            return Ok(false);
        };
        match self.session.ensure_logged_in(&settings).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                Ok(false)
            }
        }
    }

    /// One-shot login check for the UI's connection test. Does not
    /// disturb the running session.
    pub async fn test_connection(&self, settings: &Settings) -> Result<(), String> {
        self.session.probe(settings).await.map_err(|e| e.to_string())
    }

    /// Current state for the UI
    pub fn snapshot(&self) -> MonitorSnapshot {
        let last_checked = self.store.last_checked().unwrap_or_default();
        let alert_count = self.store.load_alerts().map(|a| a.len()).unwrap_or(0);

        MonitorSnapshot {
            api_version: API_VERSION,
            state: self.state,
            monitoring: self.state.is_monitoring(),
            monitoring_paused: self.state == MonitorState::PausedForBusinessHours,
            logged_in: self.session.is_logged_in(),
            last_checked,
            alert_count,
        }
    }

    fn deadline_due(&self, deadline: Option<MonotonicInstant>, now_mono: MonotonicInstant) -> bool {
        deadline.is_some_and(|due| now_mono >= due)
    }

    fn pause(&mut self, events: &mut Vec<CoreEvent>) {
        info!("Business hours ended, pausing monitoring");
        self.state = MonitorState::PausedForBusinessHours;
        self.next_poll_due = None;
        self.session_recheck_due = None;
        if let Err(e) = self.store.set_paused(true) {
            warn!(error = %e, "Failed to persist paused marker");
        }
        events.push(CoreEvent::PauseStateChanged { paused: true });
    }

    fn resume(&mut self, events: &mut Vec<CoreEvent>, now_mono: MonotonicInstant) {
        info!("Business hours began, resuming monitoring");
        self.state = MonitorState::Running;
        // The portal session almost certainly expired across the gap
        self.session.invalidate();
        self.next_poll_due = Some(now_mono);
        self.session_recheck_due = Some(now_mono + self.timing.session_recheck);
        if let Err(e) = self.store.set_paused(false) {
            warn!(error = %e, "Failed to clear paused marker");
        }
        events.push(CoreEvent::PauseStateChanged { paused: false });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tickwatch_host_api::{MockNotifier, MockPageDriver};
    use tickwatch_store::SqliteStore;

    fn fast_timing() -> MonitorTiming {
        MonitorTiming {
            session_recheck: Duration::from_secs(45 * 60),
            notification_ttl: Duration::from_secs(120),
            session: SessionTiming {
                login_timeout: Duration::from_millis(50),
                poll_every: Duration::from_millis(1),
            },
            scrape: ScrapeTiming {
                grid_timeout: Duration::from_millis(50),
                poll_every: Duration::from_millis(1),
            },
        }
    }

    fn settings() -> Settings {
        Settings {
            portal_url: "https://support.example.co.kr/home".into(),
            username: "kim".into(),
            password: "secret".into(),
            check_interval_minutes: 5,
            ..Settings::default()
        }
    }

    fn rows(rows: serde_json::Value) -> serde_json::Value {
        json!({"success": true, "rows": rows})
    }

    fn driver_with_portal(grid: serde_json::Value) -> Arc<MockPageDriver> {
        let driver = Arc::new(MockPageDriver::new());
        driver.respond("__twLoginFill", json!({"success": true}));
        driver.respond("__twLoginSettled", json!(true));
        driver.respond("__twLoginVerify", json!({"success": true}));
        driver.respond("__twGridState", json!("ready"));
        driver.respond("__twGridExtract", grid);
        driver
    }

    struct Harness {
        engine: MonitorEngine,
        store: Arc<SqliteStore>,
        driver: Arc<MockPageDriver>,
        notifier: Arc<MockNotifier>,
    }

    fn harness_with(grid: serde_json::Value, settings: Option<Settings>) -> Harness {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        if let Some(settings) = settings {
            store.save_settings(&settings).unwrap();
        }
        let driver = driver_with_portal(grid);
        let notifier = Arc::new(MockNotifier::new());
        let engine = MonitorEngine::new(
            store.clone(),
            driver.clone(),
            notifier.clone(),
            fast_timing(),
        );
        Harness {
            engine,
            store,
            driver,
            notifier,
        }
    }

    fn row(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("요청 {}", id),
            "company": "Acme",
            "status": status,
            "writer": "kim",
            "requestedAt": "2025-12-24 09:00",
            "requestedAtAll": format!("2025-12-24 09:00:{:02}", id.len()),
            "processedAt": ""
        })
    }

    #[tokio::test]
    async fn start_without_settings_is_config_error() {
        let mut h = harness_with(rows(json!([])), None);

        let err = h
            .engine
            .start(tickwatch_util::now(), MonotonicInstant::now())
            .await
            .unwrap_err();

        assert!(matches!(err, StartError::MissingSettings));
        assert_eq!(h.engine.state(), MonitorState::Stopped);
    }

    #[tokio::test]
    async fn start_with_bad_login_returns_to_stopped() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.save_settings(&settings()).unwrap();

        let driver = Arc::new(MockPageDriver::new());
        driver.respond("__twLoginFill", json!({"success": true}));
        driver.respond("__twLoginSettled", json!(true));
        driver.respond(
            "__twLoginVerify",
            json!({"success": false, "message": "로그인 실패"}),
        );

        let notifier = Arc::new(MockNotifier::new());
        let mut engine = MonitorEngine::new(store, driver, notifier, fast_timing());

        let err = engine
            .start(tickwatch_util::now(), MonotonicInstant::now())
            .await
            .unwrap_err();

        assert!(matches!(err, StartError::Auth(_)));
        assert_eq!(engine.state(), MonitorState::Stopped);
    }

    #[tokio::test]
    async fn start_then_tick_runs_first_poll() {
        let mut h = harness_with(rows(json!([row("A1", "접수")])), Some(settings()));

        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();

        let events = h.engine.start(now, now_mono).await.unwrap();
        assert!(events.contains(&CoreEvent::MonitoringChanged { monitoring: true }));
        assert_eq!(h.engine.state(), MonitorState::Running);

        let events = h.engine.tick(now, now_mono).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, CoreEvent::AlertsUpdated { added: 1, .. })));

        // First run persists but never notifies
        assert_eq!(h.store.load_alerts().unwrap().len(), 1);
        assert!(h.notifier.shown_ids().is_empty());
    }

    #[tokio::test]
    async fn second_poll_notifies_new_and_watched_transition() {
        let mut h = harness_with(rows(json!([row("A1", "접수")])), Some(settings()));

        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();

        h.engine.start(now, now_mono).await.unwrap();
        h.engine.tick(now, now_mono).await;

        // Next scrape: A1 transitioned to 고객사답변, A2 is new
        h.driver.respond_seq(
            "__twGridExtract",
            vec![rows(json!([row("A1", "고객사답변"), row("A2", "접수")]))],
        );

        let report = h.engine.poll_now(now, now_mono).await;
        assert_eq!(report.added, 1);
        assert_eq!(report.status_changed, 1);

        // Both the transition and the new ticket notified
        let shown = h.notifier.shown_ids();
        assert_eq!(shown.len(), 2);

        // Persisted set sorted with the customer reply first (score 100)
        let alerts = h.store.load_alerts().unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id.as_str(), "A1");
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, CoreEvent::AlertsUpdated { added: 1, status_changed: 1 })));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut h = harness_with(rows(json!([])), Some(settings()));

        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();

        h.engine.start(now, now_mono).await.unwrap();
        h.store
            .replace_alerts(&[crate::classify::annotate(
                tickwatch_api::Ticket {
                    id: tickwatch_util::TicketId::new("A1"),
                    title: "요청".into(),
                    company: "Acme".into(),
                    status: tickwatch_api::TicketStatus::Received,
                    writer: "kim".into(),
                    requested_at: "2025-12-24 09:00".into(),
                    requested_at_full: "2025-12-24 09:00:00".into(),
                    processed_at: None,
                    flags: Default::default(),
                },
                now,
            )])
            .unwrap();

        let events = h.engine.stop();
        assert_eq!(
            events,
            vec![CoreEvent::MonitoringChanged { monitoring: false }]
        );
        assert_eq!(h.engine.state(), MonitorState::Stopped);

        // Second stop: no error, no events, still stopped
        let events = h.engine.stop();
        assert!(events.is_empty());
        assert_eq!(h.engine.state(), MonitorState::Stopped);

        // Stopping does not clear the persisted alert set
        assert_eq!(h.store.load_alerts().unwrap().len(), 1);

        // No polls fire after stop
        let events = h
            .engine
            .tick(now, now_mono + Duration::from_secs(3600))
            .await;
        assert!(events.is_empty());
        assert_eq!(h.driver.render_count(), 1); // the start() login only
    }

    #[tokio::test]
    async fn restart_rearms_instead_of_double_scheduling() {
        let mut h = harness_with(rows(json!([row("A1", "접수")])), Some(settings()));

        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();

        h.engine.start(now, now_mono).await.unwrap();
        let events = h.engine.start(now, now_mono).await.unwrap();
        // Already monitoring: no duplicate MonitoringChanged
        assert!(events.is_empty());

        // One tick, one poll: exactly one scrape page after the login page
        h.engine.tick(now, now_mono).await;
        assert_eq!(h.driver.render_count(), 2);

        // Interval not yet elapsed: no second poll
        h.engine.tick(now, now_mono + Duration::from_secs(1)).await;
        assert_eq!(h.driver.render_count(), 2);

        // After the 5-minute interval the next poll fires
        h.engine
            .tick(now, now_mono + Duration::from_secs(5 * 60 + 1))
            .await;
        assert_eq!(h.driver.render_count(), 3);
    }

    #[tokio::test]
    async fn scrape_failure_keeps_running_and_bumps_last_checked() {
        let mut h = harness_with(rows(json!([row("A1", "접수")])), Some(settings()));

        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();

        h.engine.start(now, now_mono).await.unwrap();
        h.engine.tick(now, now_mono).await;
        assert_eq!(h.store.load_alerts().unwrap().len(), 1);

        // Grid goes away (session expired server-side)
        h.driver.respond_seq("__twGridState", vec![json!("no-frame")]);

        let report = h.engine.poll_now(now, now_mono).await;
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, CoreEvent::ScrapingError { .. })));

        // Still running, alert set untouched, last_checked bumped,
        // session invalidated for the next cycle
        assert_eq!(h.engine.state(), MonitorState::Running);
        assert_eq!(h.store.load_alerts().unwrap().len(), 1);
        assert!(h.store.last_checked().unwrap().is_some());
        assert!(!h.engine.is_logged_in());
    }

    #[tokio::test]
    async fn business_hours_pause_and_resume() {
        let mut bh_settings = settings();
        bh_settings.business_hours_only = true;
        let mut h = harness_with(rows(json!([row("A1", "접수")])), Some(bh_settings));

        let now_mono = MonotonicInstant::now();
        // Wednesday 10:00, inside hours
        let wednesday = chrono::TimeZone::with_ymd_and_hms(&chrono::Local, 2025, 12, 24, 10, 0, 0)
            .unwrap();
        // Wednesday 20:30, outside hours
        let evening = chrono::TimeZone::with_ymd_and_hms(&chrono::Local, 2025, 12, 24, 20, 30, 0)
            .unwrap();

        h.engine.start(wednesday, now_mono).await.unwrap();
        assert_eq!(h.engine.state(), MonitorState::Running);

        // Hours end: tick pauses and persists the marker
        let events = h.engine.tick(evening, now_mono).await;
        assert!(events.contains(&CoreEvent::PauseStateChanged { paused: true }));
        assert_eq!(h.engine.state(), MonitorState::PausedForBusinessHours);
        assert!(h.store.is_paused().unwrap());

        // Still paused later in the evening
        let events = h
            .engine
            .tick(evening, now_mono + Duration::from_secs(60))
            .await;
        assert!(events.is_empty());

        // Next morning inside hours: resume, marker cleared, session
        // invalidated so the next poll logs in fresh
        let thursday = chrono::TimeZone::with_ymd_and_hms(&chrono::Local, 2025, 12, 25, 8, 0, 0)
            .unwrap();
        let events = h
            .engine
            .tick(thursday, now_mono + Duration::from_secs(120))
            .await;
        assert!(events.contains(&CoreEvent::PauseStateChanged { paused: false }));
        assert_eq!(h.engine.state(), MonitorState::Running);
        assert!(!h.store.is_paused().unwrap());
        assert!(!h.engine.is_logged_in());
    }

    #[tokio::test]
    async fn start_outside_hours_enters_paused() {
        let mut bh_settings = settings();
        bh_settings.business_hours_only = true;
        let mut h = harness_with(rows(json!([])), Some(bh_settings));

        // Saturday noon
        let saturday = chrono::TimeZone::with_ymd_and_hms(&chrono::Local, 2025, 12, 27, 12, 0, 0)
            .unwrap();
        let events = h
            .engine
            .start(saturday, MonotonicInstant::now())
            .await
            .unwrap();

        assert_eq!(h.engine.state(), MonitorState::PausedForBusinessHours);
        assert!(events.contains(&CoreEvent::MonitoringChanged { monitoring: true }));
        assert!(events.contains(&CoreEvent::PauseStateChanged { paused: true }));
        // No login was attempted while the gate is closed
        assert_eq!(h.driver.render_count(), 0);
    }

    #[tokio::test]
    async fn paused_marker_survives_restart() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.save_settings(&settings()).unwrap();
        store.set_paused(true).unwrap();

        let driver = Arc::new(MockPageDriver::new());
        let notifier = Arc::new(MockNotifier::new());
        let engine = MonitorEngine::new(store, driver, notifier, fast_timing());

        assert_eq!(engine.state(), MonitorState::PausedForBusinessHours);
    }

    #[tokio::test]
    async fn cleared_alert_set_suppresses_like_first_run() {
        let mut h = harness_with(rows(json!([row("A1", "접수")])), Some(settings()));

        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();

        h.engine.start(now, now_mono).await.unwrap();
        h.engine.tick(now, now_mono).await;

        h.store.clear_alerts().unwrap();

        let report = h.engine.poll_now(now, now_mono).await;
        assert_eq!(report.added, 1);
        // Suppressed: previous set was empty again
        assert!(h.notifier.shown_ids().is_empty());
    }

    #[tokio::test]
    async fn snapshot_reflects_engine_state() {
        let mut h = harness_with(rows(json!([row("A1", "접수")])), Some(settings()));

        let snapshot = h.engine.snapshot();
        assert!(!snapshot.monitoring);
        assert!(!snapshot.logged_in);
        assert_eq!(snapshot.alert_count, 0);

        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();
        h.engine.start(now, now_mono).await.unwrap();
        h.engine.tick(now, now_mono).await;

        let snapshot = h.engine.snapshot();
        assert!(snapshot.monitoring);
        assert!(snapshot.logged_in);
        assert!(!snapshot.monitoring_paused);
        assert_eq!(snapshot.alert_count, 1);
        assert!(snapshot.last_checked.is_some());
    }
}
