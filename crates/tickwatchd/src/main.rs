//! tickwatchd - The portal monitoring background service
//!
//! This is the main entry point for the tickwatchd service.
//! It wires together all the components:
//! - Configuration loading (seeds the store on first run)
//! - Store initialization
//! - Monitoring engine
//! - Desktop host adapters (browser driver, notifier)
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tickwatch_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Pagination,
    Response, ResponsePayload, Settings,
};
use tickwatch_config::SettingsBundle;
use tickwatch_core::{CoreEvent, MonitorEngine, MonitorTiming, StartError};
use tickwatch_host_api::{Notifier, NotifierEvent, PageDriver};
use tickwatch_host_desktop::{
    open_external, probe_portal, ChromiumPageDriver, DesktopNotifier, PROBE_TIMEOUT,
};
use tickwatch_ipc::{IpcServer, ServerMessage};
use tickwatch_store::{SqliteStore, Store};
use tickwatch_util::{default_config_path, ClientId, MonotonicInstant, RateLimiter};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PAGE_SIZE: usize = 20;

/// tickwatchd - Support ticket monitoring for the corporate helpdesk portal
#[derive(Parser, Debug)]
#[command(name = "tickwatchd")]
#[command(about = "Support ticket monitoring service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/tickwatch/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set TICKWATCH_SOCKET env var)
    #[arg(short, long, env = "TICKWATCH_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set TICKWATCH_DATA_DIR env var)
    #[arg(short, long, env = "TICKWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: Arc<Mutex<MonitorEngine>>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    notifier: Arc<DesktopNotifier>,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        // The config file is optional: the UI can supply everything over
        // IPC. When present it seeds the store on first run.
        let bundle = if args.config.exists() {
            let bundle = tickwatch_config::load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?;
            info!(config_path = %args.config.display(), "Configuration loaded");
            Some(bundle)
        } else {
            info!(config_path = %args.config.display(), "No config file, starting unconfigured");
            None
        };

        // Determine paths
        let socket_path = args
            .socket
            .clone()
            .or_else(|| bundle.as_ref().map(|b| b.daemon.socket_path.clone()))
            .unwrap_or_else(tickwatch_util::default_socket_path);

        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| bundle.as_ref().map(|b| b.daemon.data_dir.clone()))
            .unwrap_or_else(tickwatch_util::default_data_dir);

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join("tickwatchd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        // Seed settings from the config file on first run only; after
        // that the store is the source of truth
        if let Some(SettingsBundle { settings, .. }) = &bundle {
            if store.load_settings()?.is_none() {
                store.save_settings(settings)?;
                info!("Settings seeded from config file");
            }
        }

        // Host adapters
        let driver: Arc<dyn PageDriver> = Arc::new(ChromiumPageDriver::new());
        let notifier = Arc::new(DesktopNotifier::new());

        // Monitoring engine
        let engine = MonitorEngine::new(
            store.clone(),
            driver,
            notifier.clone() as Arc<dyn Notifier>,
            MonitorTiming::default(),
        );

        // IPC server
        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        // Rate limiter: 30 requests per second per client
        let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(30, Duration::from_secs(1))));

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            ipc: Arc::new(ipc),
            store,
            notifier,
            rate_limiter,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .expect("Message receiver should be available");

        let mut notifier_events = self.notifier.subscribe();

        let engine = self.engine.clone();
        let store = self.store.clone();
        let rate_limiter = self.rate_limiter.clone();

        // Spawn IPC accept task
        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        // The engine decides what is due; the loop just keeps time
        let tick_interval = Duration::from_secs(1);
        let mut tick_timer = tokio::time::interval(tick_interval);
        tick_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Tick timer - gate reconciliation, session upkeep, polls
                _ = tick_timer.tick() => {
                    let now = tickwatch_util::now();
                    let now_mono = MonotonicInstant::now();

                    let events = {
                        let mut engine = engine.lock().await;
                        engine.tick(now, now_mono).await
                    };

                    Self::broadcast_core_events(&engine, &ipc_ref, events).await;
                }

                // Notification clicks
                Some(event) = notifier_events.recv() => {
                    Self::handle_notifier_event(&store, event).await;
                }

                // IPC messages
                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&engine, &store, &ipc_ref, &rate_limiter, msg).await;
                }
            }
        }

        // Graceful shutdown
        info!("Shutting down tickwatchd");

        ipc_ref.broadcast_event(Event::new(EventPayload::Shutdown));

        {
            let mut engine = engine.lock().await;
            engine.stop();
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Translate engine events into IPC broadcasts
    async fn broadcast_core_events(
        engine: &Arc<Mutex<MonitorEngine>>,
        ipc: &Arc<IpcServer>,
        events: Vec<CoreEvent>,
    ) {
        for event in events {
            match event {
                CoreEvent::MonitoringChanged { monitoring } => {
                    ipc.broadcast_event(Event::new(EventPayload::MonitoringChanged {
                        monitoring,
                    }));
                    let snapshot = engine.lock().await.snapshot();
                    ipc.broadcast_event(Event::new(EventPayload::StateChanged(snapshot)));
                }
                CoreEvent::PauseStateChanged { .. } => {
                    let snapshot = engine.lock().await.snapshot();
                    ipc.broadcast_event(Event::new(EventPayload::StateChanged(snapshot)));
                }
                CoreEvent::AlertsUpdated {
                    added,
                    status_changed,
                } => {
                    ipc.broadcast_event(Event::new(EventPayload::AlertsUpdated {
                        added,
                        status_changed,
                    }));
                }
                CoreEvent::LoginError { message } => {
                    ipc.broadcast_event(Event::new(EventPayload::LoginError { message }));
                }
                CoreEvent::ScrapingError { message } => {
                    ipc.broadcast_event(Event::new(EventPayload::ScrapingError { message }));
                }
            }
        }
    }

    /// A clicked notification marks the ticket read and opens the portal
    async fn handle_notifier_event(store: &Arc<dyn Store>, event: NotifierEvent) {
        match event {
            NotifierEvent::Clicked { ticket_id } => {
                info!(ticket_id = %ticket_id, "Notification clicked");

                if let Err(e) = store.mark_read(&ticket_id, tickwatch_util::now()) {
                    warn!(ticket_id = %ticket_id, error = %e, "Failed to mark ticket read");
                }

                let portal_url = store
                    .load_settings()
                    .ok()
                    .flatten()
                    .map(|s| s.portal_url)
                    .unwrap_or_default();
                if portal_url.is_empty() {
                    warn!("No portal URL configured, cannot open ticket");
                    return;
                }

                if let Err(e) = open_external(&portal_url).await {
                    warn!(error = %e, "Failed to open portal");
                }
            }
        }
    }

    async fn handle_ipc_message(
        engine: &Arc<Mutex<MonitorEngine>>,
        store: &Arc<dyn Store>,
        ipc: &Arc<IpcServer>,
        rate_limiter: &Arc<Mutex<RateLimiter>>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                // Rate limiting
                {
                    let mut limiter = rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                let response = Self::handle_command(
                    engine,
                    store,
                    ipc,
                    &client_id,
                    request.request_id,
                    request.command,
                )
                .await;

                let _ = ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let mut limiter = rate_limiter.lock().await;
                limiter.remove_client(&client_id);
            }
        }
    }

    async fn handle_command(
        engine: &Arc<Mutex<MonitorEngine>>,
        store: &Arc<dyn Store>,
        ipc: &Arc<IpcServer>,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> Response {
        let now = tickwatch_util::now();
        let now_mono = MonotonicInstant::now();

        match command {
            Command::ToggleMonitoring { on } => {
                if let Some(info) = ipc.get_client_info(client_id).await {
                    if !info.role.can_toggle() {
                        return Response::error(
                            request_id,
                            ErrorInfo::new(ErrorCode::PermissionDenied, "Shell role required"),
                        );
                    }
                }

                let result = {
                    let mut eng = engine.lock().await;
                    eng.toggle(on, now, now_mono).await
                };

                match result {
                    Ok(events) => {
                        Self::broadcast_core_events(engine, ipc, events).await;
                        let monitoring = engine.lock().await.state().is_monitoring();
                        Response::success(
                            request_id,
                            ResponsePayload::Toggled {
                                monitoring,
                                message: None,
                            },
                        )
                    }
                    Err(e) => {
                        // Auth failures also go out on the event stream so
                        // a UI that is not awaiting this response sees them
                        if let StartError::Auth(message) = &e {
                            ipc.broadcast_event(Event::new(EventPayload::LoginError {
                                message: message.clone(),
                            }));
                        }
                        Response::success(
                            request_id,
                            ResponsePayload::Toggled {
                                monitoring: false,
                                message: Some(e.to_string()),
                            },
                        )
                    }
                }
            }

            Command::GetMonitoringStatus => {
                let snapshot = engine.lock().await.snapshot();
                Response::success(request_id, ResponsePayload::Status(snapshot))
            }

            Command::GetAlerts { page, page_size } => {
                let alerts = match store.load_alerts() {
                    Ok(alerts) => alerts,
                    Err(e) => {
                        return Response::error(
                            request_id,
                            ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                        );
                    }
                };

                // pending/delayed depend on "now"; recompute at read time
                // instead of trusting persisted values
                let alerts =
                    tickwatch_core::sort(tickwatch_core::annotate_all(alerts, now));
                let last_checked = store.last_checked().unwrap_or_default();
                let mut read_ids: Vec<_> =
                    store.read_ids().unwrap_or_default().into_iter().collect();
                read_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

                let (alerts, pagination) = match page {
                    Some(page) => {
                        let page = page.max(1);
                        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
                        let total = alerts.len();
                        let total_pages = total.div_ceil(page_size).max(1);
                        let page_alerts: Vec<_> = alerts
                            .into_iter()
                            .skip((page - 1) * page_size)
                            .take(page_size)
                            .collect();
                        (
                            page_alerts,
                            Some(Pagination {
                                page,
                                page_size,
                                total,
                                total_pages,
                            }),
                        )
                    }
                    None => (alerts, None),
                };

                Response::success(
                    request_id,
                    ResponsePayload::Alerts {
                        alerts,
                        last_checked,
                        read_ids,
                        pagination,
                    },
                )
            }

            Command::MarkAlertRead { ticket_id } => match store.mark_read(&ticket_id, now) {
                Ok(()) => Response::success(request_id, ResponsePayload::MarkedRead),
                Err(e) => Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                ),
            },

            Command::OpenTicket { ticket_id } => {
                let portal_url = store
                    .load_settings()
                    .ok()
                    .flatten()
                    .map(|s| s.portal_url)
                    .unwrap_or_default();
                if portal_url.is_empty() {
                    return Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::ConfigError, "포털 URL이 설정되지 않았습니다"),
                    );
                }

                debug!(ticket_id = %ticket_id, "Opening ticket in external browser");
                match open_external(&portal_url).await {
                    Ok(()) => Response::success(request_id, ResponsePayload::Opened),
                    Err(e) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::InternalError, e.to_string()),
                    ),
                }
            }

            Command::ManualCheck => {
                let report = {
                    let mut eng = engine.lock().await;
                    eng.poll_now(now, now_mono).await
                };

                let added = report.added;
                let status_changed = report.status_changed;
                Self::broadcast_core_events(engine, ipc, report.events).await;

                Response::success(
                    request_id,
                    ResponsePayload::Checked {
                        new_alerts: added,
                        status_changed,
                    },
                )
            }

            Command::GetSettings => {
                let settings = store
                    .load_settings()
                    .unwrap_or_default()
                    .unwrap_or_default();
                Response::success(request_id, ResponsePayload::Settings(settings))
            }

            Command::SaveSettings { settings } => {
                if let Some(info) = ipc.get_client_info(client_id).await {
                    if !info.role.can_save_settings() {
                        return Response::error(
                            request_id,
                            ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"),
                        );
                    }
                }

                if settings.check_interval_minutes < 1 {
                    return Response::error(
                        request_id,
                        ErrorInfo::new(
                            ErrorCode::ConfigError,
                            "check_interval_minutes must be at least 1",
                        ),
                    );
                }

                match store.save_settings(&settings) {
                    Ok(()) => Response::success(request_id, ResponsePayload::SettingsSaved),
                    Err(e) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                    ),
                }
            }

            Command::TestConnection { settings } => {
                Self::test_connection(engine, &settings, request_id).await
            }

            Command::CheckSession => {
                let logged_in = engine.lock().await.is_logged_in();
                Response::success(request_id, ResponsePayload::Session { logged_in })
            }

            Command::RefreshSession => {
                let result = {
                    let mut eng = engine.lock().await;
                    eng.refresh_session().await
                };
                match result {
                    Ok(logged_in) => {
                        Response::success(request_id, ResponsePayload::Refreshed { logged_in })
                    }
                    Err(e) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                    ),
                }
            }

            Command::ClearAlerts => {
                if let Some(info) = ipc.get_client_info(client_id).await {
                    if !info.role.can_clear_alerts() {
                        return Response::error(
                            request_id,
                            ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"),
                        );
                    }
                }

                match store.clear_alerts() {
                    Ok(()) => Response::success(request_id, ResponsePayload::Cleared),
                    Err(e) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                    ),
                }
            }

            Command::SubscribeEvents => {
                let response = Response::success(
                    request_id,
                    ResponsePayload::Subscribed {
                        client_id: client_id.clone(),
                    },
                );

                // New subscribers get a snapshot right away
                let snapshot = engine.lock().await.snapshot();
                ipc.broadcast_event(Event::new(EventPayload::StateChanged(snapshot)));

                response
            }

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::GetHealth => {
                let monitoring = engine.lock().await.state().is_monitoring();
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    store_ok: store.is_healthy(),
                    monitoring,
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }

    async fn test_connection(
        engine: &Arc<Mutex<MonitorEngine>>,
        settings: &Settings,
        request_id: u64,
    ) -> Response {
        // Distinguish "portal down" from "credentials wrong"
        if !probe_portal(&settings.portal_url, PROBE_TIMEOUT).await {
            return Response::error(
                request_id,
                ErrorInfo::new(ErrorCode::ScrapeError, "포털에 연결할 수 없습니다"),
            );
        }

        let result = {
            let eng = engine.lock().await;
            eng.test_connection(settings).await
        };

        match result {
            Ok(()) => Response::success(request_id, ResponsePayload::ConnectionOk),
            Err(message) => {
                Response::error(request_id, ErrorInfo::new(ErrorCode::AuthError, message))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "tickwatchd starting");

    // Create and run the service
    let service = Service::new(&args).await?;
    service.run().await
}
