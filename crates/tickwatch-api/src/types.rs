//! Shared types for the tickwatchd API

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tickwatch_util::{BusinessHours, TicketId};

/// Processing status of a portal ticket.
///
/// The portal reports these as display strings; the known values are kept
/// as variants so the engine can match on them, anything else round-trips
/// through `Other` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    /// 접수 - received, not yet picked up
    Received,
    /// 처리중 - in progress
    InProgress,
    /// 고객사답변 - customer replied, waiting on us
    CustomerReplied,
    /// 검토 - under review
    Review,
    /// Any status the portal reports that we don't special-case
    Other(String),
}

impl TicketStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::Received => "접수",
            TicketStatus::InProgress => "처리중",
            TicketStatus::CustomerReplied => "고객사답변",
            TicketStatus::Review => "검토",
            TicketStatus::Other(s) => s,
        }
    }
}

impl From<String> for TicketStatus {
    fn from(s: String) -> Self {
        match s.trim() {
            "접수" => TicketStatus::Received,
            "처리중" => TicketStatus::InProgress,
            "고객사답변" => TicketStatus::CustomerReplied,
            "검토" => TicketStatus::Review,
            _ => TicketStatus::Other(s),
        }
    }
}

impl From<&str> for TicketStatus {
    fn from(s: &str) -> Self {
        TicketStatus::from(s.to_string())
    }
}

impl From<TicketStatus> for String {
    fn from(status: TicketStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived classification flags. Computed from the ticket at read time,
/// never trusted from persisted data (pending/delayed depend on "now").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFlags {
    /// Title carries an urgency marker
    #[serde(default)]
    pub urgent: bool,
    /// Took more than 7 days from request to processing
    #[serde(default)]
    pub delayed: bool,
    /// Still unassigned more than an hour after arrival
    #[serde(default)]
    pub pending: bool,
}

/// One support request row from the portal's ticket grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Portal-assigned ticket number (dedup key)
    pub id: TicketId,
    pub title: String,
    pub company: String,
    pub status: TicketStatus,
    pub writer: String,
    /// Request timestamp as the portal formats it (not parsed by the scraper)
    pub requested_at: String,
    /// Full-precision request timestamp, used as the sort tie-breaker
    pub requested_at_full: String,
    /// Processing timestamp, if the ticket has been picked up
    pub processed_at: Option<String>,
    #[serde(default)]
    pub flags: TicketFlags,
}

/// Monitoring state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Stopped,
    Running,
    PausedForBusinessHours,
}

impl MonitorState {
    /// Whether monitoring is on from the user's perspective (a
    /// business-hours pause still counts as "on").
    pub fn is_monitoring(&self) -> bool {
        !matches!(self, MonitorState::Stopped)
    }
}

/// Full monitoring state snapshot for the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub api_version: u32,
    pub state: MonitorState,
    pub monitoring: bool,
    pub monitoring_paused: bool,
    pub logged_in: bool,
    pub last_checked: Option<DateTime<Local>>,
    pub alert_count: usize,
}

/// User-editable monitoring settings.
///
/// Persisted in the store, seedable from a TOML file, and updated at
/// runtime through `SaveSettings`. Read by every scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub portal_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub check_interval_minutes: u32,
    #[serde(default)]
    pub business_hours_only: bool,
    #[serde(default)]
    pub business_hours: BusinessHours,
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
    /// Portal-side status pre-filter applied to the grid search
    #[serde(default)]
    pub status_filter: Vec<String>,
    /// Portal-side date-range floor, in days before today
    #[serde(default)]
    pub lookback_days: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            portal_url: String::new(),
            username: String::new(),
            password: String::new(),
            check_interval_minutes: 15,
            business_hours_only: false,
            business_hours: BusinessHours::default(),
            enable_notifications: true,
            status_filter: Vec::new(),
            lookback_days: None,
        }
    }
}

impl Settings {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Pagination info for the alerts listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// UI shell - can toggle monitoring, read and acknowledge alerts
    Shell,
    /// Local admin - can also change settings and clear alerts
    Admin,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_toggle(&self) -> bool {
        matches!(self, ClientRole::Shell | ClientRole::Admin)
    }

    pub fn can_save_settings(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }

    pub fn can_clear_alerts(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub monitoring: bool,
}
