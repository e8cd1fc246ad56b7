//! Command types for the tickwatchd protocol

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tickwatch_util::{ClientId, TicketId};

use crate::{ClientRole, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    ConfigError,
    AuthError,
    ScrapeError,
    TicketNotFound,
    PermissionDenied,
    RateLimited,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Turn monitoring on or off
    ToggleMonitoring { on: bool },

    /// Get monitoring state, paused flag, and last-checked timestamp
    GetMonitoringStatus,

    /// Get the persisted alert set, optionally paginated
    GetAlerts {
        page: Option<usize>,
        page_size: Option<usize>,
    },

    /// Mark one alert as read
    MarkAlertRead { ticket_id: TicketId },

    /// Open a ticket's detail view in the external browser
    OpenTicket { ticket_id: TicketId },

    /// Run one poll cycle immediately, outside the schedule
    ManualCheck,

    /// Read current settings
    GetSettings,

    /// Replace settings (admin only)
    SaveSettings { settings: crate::Settings },

    /// Try a one-shot login with the supplied settings without touching
    /// the running session
    TestConnection { settings: crate::Settings },

    /// Report whether the portal session flag is currently set
    CheckSession,

    /// Drop the session flag and log in again
    RefreshSession,

    /// Clear the persisted alert set (admin only)
    ClearAlerts,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Toggled {
        monitoring: bool,
        message: Option<String>,
    },
    Status(crate::MonitorSnapshot),
    Alerts {
        alerts: Vec<crate::Ticket>,
        last_checked: Option<DateTime<Local>>,
        /// Ids the user has already seen; kept separate from the alert
        /// set because that set is replaced wholesale each poll
        read_ids: Vec<TicketId>,
        pagination: Option<crate::Pagination>,
    },
    MarkedRead,
    Opened,
    Checked {
        new_alerts: usize,
        status_changed: usize,
    },
    Settings(crate::Settings),
    SettingsSaved,
    ConnectionOk,
    Session {
        logged_in: bool,
    },
    Refreshed {
        logged_in: bool,
    },
    Cleared,
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Health(crate::HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
    /// Process name if available
    pub process_name: Option<String>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
            process_name: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = Request::new(1, Command::GetMonitoringStatus);
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
        assert!(matches!(parsed.command, Command::GetMonitoringStatus));
    }

    #[test]
    fn response_serialization() {
        let resp = Response::success(
            1,
            ResponsePayload::Status(crate::MonitorSnapshot {
                api_version: API_VERSION,
                state: crate::MonitorState::Stopped,
                monitoring: false,
                monitoring_paused: false,
                logged_in: false,
                last_checked: None,
                alert_count: 0,
            }),
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
    }

    #[test]
    fn toggle_command_round_trip() {
        let req = Request::new(7, Command::ToggleMonitoring { on: true });
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("toggle_monitoring"));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed.command, Command::ToggleMonitoring { on: true }));
    }
}
