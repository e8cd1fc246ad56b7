//! Integration tests for tickwatchd
//!
//! These drive the monitoring engine end-to-end against the mock host
//! adapters and an in-memory store - no browser, no portal.

use chrono::TimeZone;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tickwatch_api::{MonitorState, Settings, TicketStatus};
use tickwatch_core::{
    diff, CoreEvent, MonitorEngine, MonitorTiming, ScrapeTiming, SessionTiming, StartError,
};
use tickwatch_host_api::{MockNotifier, MockPageDriver};
use tickwatch_store::{SqliteStore, Store};
use tickwatch_util::{BusinessHours, MonotonicInstant, TicketId};

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

fn test_settings() -> Settings {
    Settings {
        portal_url: "https://support.example.co.kr/home".into(),
        username: "kim".into(),
        password: "secret".into(),
        check_interval_minutes: 5,
        business_hours_only: false,
        enable_notifications: true,
        ..Settings::default()
    }
}

fn row(id: &str, status: &str, requested_full: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("요청 {}", id),
        "company": "Acme",
        "status": status,
        "writer": "kim",
        "requestedAt": requested_full.chars().take(16).collect::<String>(),
        "requestedAtAll": requested_full,
        "processedAt": ""
    })
}

fn grid(rows: Vec<serde_json::Value>) -> serde_json::Value {
    json!({"success": true, "rows": rows})
}

fn portal_driver(grid: serde_json::Value) -> Arc<MockPageDriver> {
    let driver = Arc::new(MockPageDriver::new());
    driver.respond("__twLoginFill", json!({"success": true}));
    driver.respond("__twLoginSettled", json!(true));
    driver.respond("__twLoginVerify", json!({"success": true, "message": "로그인 성공"}));
    driver.respond("__twGridState", json!("ready"));
    driver.respond("__twGridExtract", grid);
    driver
}

struct TestBed {
    engine: MonitorEngine,
    store: Arc<SqliteStore>,
    driver: Arc<MockPageDriver>,
    notifier: Arc<MockNotifier>,
}

fn testbed(grid_rows: serde_json::Value, settings: Settings) -> TestBed {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store.save_settings(&settings).unwrap();
    let driver = portal_driver(grid_rows);
    let notifier = Arc::new(MockNotifier::new());
    let engine = MonitorEngine::new(
        store.clone(),
        driver.clone(),
        notifier.clone(),
        fast_timing(),
    );
    TestBed {
        engine,
        store,
        driver,
        notifier,
    }
}

#[test]
fn dedup_invariant_holds_for_arbitrary_sets() {
    // diff(A, B).added contains exactly the ids of B absent from A
    let make = |ids: &[&str]| {
        ids.iter()
            .map(|id| tickwatch_api::Ticket {
                id: TicketId::new(*id),
                title: format!("요청 {}", id),
                company: "Acme".into(),
                status: TicketStatus::Received,
                writer: "kim".into(),
                requested_at: "2025-12-24 09:00".into(),
                requested_at_full: "2025-12-24 09:00:00".into(),
                processed_at: None,
                flags: Default::default(),
            })
            .collect::<Vec<_>>()
    };

    let previous = make(&["A1", "A2", "A3"]);
    let current = make(&["A2", "A4", "A5", "A3"]);

    let changes = diff(&previous, &current);
    let added: Vec<&str> = changes.added.iter().map(|t| t.id.as_str()).collect();

    assert_eq!(added, vec!["A4", "A5"]);
    for id in ["A1", "A2", "A3"] {
        assert!(!added.contains(&id));
    }
}

#[tokio::test]
async fn first_run_suppresses_notifications_but_persists() {
    let mut bed = testbed(
        grid(vec![
            row("A1", "접수", "2025-12-24 09:00:00"),
            row("A2", "고객사답변", "2025-12-24 09:30:00"),
        ]),
        test_settings(),
    );

    let now = tickwatch_util::now();
    let now_mono = MonotonicInstant::now();

    bed.engine.start(now, now_mono).await.unwrap();
    let report = bed.engine.poll_now(now, now_mono).await;

    // Diff output is correct even on the first run
    assert_eq!(report.added, 2);

    // Persisted, but zero notifications
    assert_eq!(bed.store.load_alerts().unwrap().len(), 2);
    assert!(bed.notifier.shown_ids().is_empty());
}

#[tokio::test]
async fn priority_ordering_is_deterministic() {
    // Equal timestamps, statuses 고객사답변/접수/처리중 in scrape order
    let ts = "2025-12-24 09:00:00";
    let mut bed = testbed(
        grid(vec![
            row("A1", "고객사답변", ts),
            row("A2", "접수", ts),
            row("A3", "처리중", ts),
        ]),
        test_settings(),
    );

    let now = tickwatch_util::now();
    let now_mono = MonotonicInstant::now();
    bed.engine.start(now, now_mono).await.unwrap();
    bed.engine.poll_now(now, now_mono).await;

    let statuses: Vec<String> = bed
        .store
        .load_alerts()
        .unwrap()
        .iter()
        .map(|t| t.status.to_string())
        .collect();
    assert_eq!(statuses, vec!["고객사답변", "처리중", "접수"]);
}

#[test]
fn business_hours_boundaries() {
    let hours = BusinessHours::default();

    // Saturday and Sunday at any hour
    for hour in 0..24 {
        let saturday = chrono::Local
            .with_ymd_and_hms(2025, 12, 27, hour, 0, 0)
            .unwrap();
        let sunday = chrono::Local
            .with_ymd_and_hms(2025, 12, 28, hour, 0, 0)
            .unwrap();
        assert!(!hours.contains(&saturday));
        assert!(!hours.contains(&sunday));
    }

    // Wednesday 10:00 inside
    let dt = chrono::Local.with_ymd_and_hms(2025, 12, 24, 10, 0, 0).unwrap();
    assert!(hours.contains(&dt));

    // Wednesday 06:59 and 20:00 exactly are outside
    let dt = chrono::Local.with_ymd_and_hms(2025, 12, 24, 6, 59, 0).unwrap();
    assert!(!hours.contains(&dt));
    let dt = chrono::Local.with_ymd_and_hms(2025, 12, 24, 20, 0, 0).unwrap();
    assert!(!hours.contains(&dt));
}

#[tokio::test]
async fn idempotent_stop_and_single_poll_per_interval() {
    let mut bed = testbed(
        grid(vec![row("A1", "접수", "2025-12-24 09:00:00")]),
        test_settings(),
    );

    let now = tickwatch_util::now();
    let start_mono = MonotonicInstant::now();

    bed.engine.start(now, start_mono).await.unwrap();

    // Simulate a 16-minute window of 1-second ticks; with a 5-minute
    // interval exactly 4 polls must run (t=0, 5m, 10m, 15m)
    for second in 0..(16 * 60) {
        bed.engine
            .tick(now, start_mono + Duration::from_secs(second))
            .await;
    }
    // render_count = 1 login + 4 scrape pages
    assert_eq!(bed.driver.render_count(), 5);

    // Stop twice: no error, stopped both times
    bed.engine.stop();
    assert_eq!(bed.engine.state(), MonitorState::Stopped);
    bed.engine.stop();
    assert_eq!(bed.engine.state(), MonitorState::Stopped);

    // No timers remain: a long tick window after stop polls nothing
    for second in 0..(16 * 60) {
        bed.engine
            .tick(now, start_mono + Duration::from_secs(16 * 60 + second))
            .await;
    }
    assert_eq!(bed.driver.render_count(), 5);
}

#[tokio::test]
async fn session_reuse_skips_the_portal_entirely() {
    let mut bed = testbed(grid(vec![]), test_settings());

    let now = tickwatch_util::now();
    let now_mono = MonotonicInstant::now();

    bed.engine.start(now, now_mono).await.unwrap();
    assert!(bed.engine.is_logged_in());
    let renders = bed.driver.render_count();

    // refresh via ensure path: a poll's login step must not render a
    // login page while the session flag is set
    bed.engine.poll_now(now, now_mono).await;
    // Exactly one more page (the scrape page), none for login
    assert_eq!(bed.driver.render_count(), renders + 1);
}

#[tokio::test]
async fn end_to_end_watched_transition_scenario() {
    // Settings: interval 5, businessHoursOnly false, notifications on.
    // Previous alerts: [{A1, 접수}]. Scrape: [{A1, 고객사답변}, {A2, 접수}].
    let mut bed = testbed(
        grid(vec![
            row("A1", "고객사답변", "2025-12-24 09:00:00"),
            row("A2", "접수", "2025-12-24 09:00:00"),
        ]),
        test_settings(),
    );

    // Seed the previous alert set
    bed.store
        .replace_alerts(&[tickwatch_api::Ticket {
            id: TicketId::new("A1"),
            title: "요청 A1".into(),
            company: "Acme".into(),
            status: TicketStatus::Received,
            writer: "kim".into(),
            requested_at: "2025-12-24 09:00".into(),
            requested_at_full: "2025-12-24 09:00:00".into(),
            processed_at: None,
            flags: Default::default(),
        }])
        .unwrap();

    let now = tickwatch_util::now();
    let now_mono = MonotonicInstant::now();

    bed.engine.start(now, now_mono).await.unwrap();
    let report = bed.engine.poll_now(now, now_mono).await;

    // added=[A2], statusChanged=[A1]
    assert_eq!(report.added, 1);
    assert_eq!(report.status_changed, 1);

    // Persisted set is the sorted 2-record set with A1 first (score 100)
    let alerts = bed.store.load_alerts().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].id.as_str(), "A1");
    assert_eq!(alerts[0].status, TicketStatus::CustomerReplied);
    assert_eq!(alerts[1].id.as_str(), "A2");

    // Exactly 2 notifications dispatched
    let shown = bed.notifier.shown_ids();
    assert_eq!(shown.len(), 2);
    assert!(shown.contains(&TicketId::new("A1")));
    assert!(shown.contains(&TicketId::new("A2")));

    // new-alerts-available emitted exactly once
    let updates = report
        .events
        .iter()
        .filter(|e| matches!(e, CoreEvent::AlertsUpdated { .. }))
        .count();
    assert_eq!(updates, 1);
}

#[tokio::test]
async fn notifications_disabled_still_persists_changes() {
    let mut settings = test_settings();
    settings.enable_notifications = false;

    let mut bed = testbed(
        grid(vec![row("A1", "접수", "2025-12-24 09:00:00")]),
        settings,
    );

    let now = tickwatch_util::now();
    let now_mono = MonotonicInstant::now();

    bed.engine.start(now, now_mono).await.unwrap();
    bed.engine.poll_now(now, now_mono).await;

    // Second cycle with a new ticket: persisted but not notified
    bed.driver.respond_seq(
        "__twGridExtract",
        vec![grid(vec![
            row("A1", "접수", "2025-12-24 09:00:00"),
            row("A2", "접수", "2025-12-24 09:10:00"),
        ])],
    );
    let report = bed.engine.poll_now(now, now_mono).await;

    assert_eq!(report.added, 1);
    assert_eq!(bed.store.load_alerts().unwrap().len(), 2);
    assert!(bed.notifier.shown_ids().is_empty());
}

#[tokio::test]
async fn auth_failure_on_start_surfaces_message() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut settings = test_settings();
    settings.password.clear();
    store.save_settings(&settings).unwrap();

    let driver = Arc::new(MockPageDriver::new());
    let notifier = Arc::new(MockNotifier::new());
    let mut engine = MonitorEngine::new(store, driver.clone(), notifier, fast_timing());

    let err = engine
        .start(tickwatch_util::now(), MonotonicInstant::now())
        .await
        .unwrap_err();

    assert!(matches!(err, StartError::Auth(_)));
    assert_eq!(engine.state(), MonitorState::Stopped);
    // Missing credentials are caught before any network traffic
    assert_eq!(driver.render_count(), 0);
}

#[test]
fn config_file_round_trip() {
    let config = r#"
        config_version = 1

        [portal]
        url = "https://support.example.co.kr/home"
        username = "kim"
        password = "secret"
        status_filter = ["접수", "처리중", "고객사답변"]

        [monitor]
        check_interval_minutes = 5
        business_hours_only = true
        start_hour = 7
        end_hour = 20

        [notifications]
        enabled = true
    "#;

    let bundle = tickwatch_config::parse_config(config).unwrap();
    assert_eq!(bundle.settings.check_interval_minutes, 5);
    assert!(bundle.settings.business_hours_only);
    assert_eq!(bundle.settings.business_hours.start_hour, 7);
    assert_eq!(bundle.settings.business_hours.end_hour, 20);
    assert_eq!(bundle.settings.status_filter.len(), 3);

    // Seeding: a fresh store takes the file's settings once
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.load_settings().unwrap().is_none());
    store.save_settings(&bundle.settings).unwrap();
    assert_eq!(store.load_settings().unwrap().unwrap(), bundle.settings);
}
