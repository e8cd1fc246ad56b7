//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Portal connection settings
    pub portal: RawPortalConfig,

    /// Polling and business-hours settings
    #[serde(default)]
    pub monitor: RawMonitorConfig,

    /// Notification settings
    #[serde(default)]
    pub notifications: RawNotificationConfig,

    /// Daemon-level settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,
}

/// Portal connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPortalConfig {
    /// Portal base URL
    pub url: String,

    /// Login username (may be left empty and filled in via the UI)
    #[serde(default)]
    pub username: String,

    /// Login password (may be left empty and filled in via the UI)
    #[serde(default)]
    pub password: String,

    /// Status values to pre-filter the grid search with
    #[serde(default)]
    pub status_filter: Vec<String>,

    /// Only fetch tickets requested within the last N days
    pub lookback_days: Option<u32>,
}

/// Polling cadence and business-hours gating
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMonitorConfig {
    /// Minutes between poll cycles (minimum 1)
    pub check_interval_minutes: Option<u32>,

    /// Only poll on weekdays within the business-hours window
    #[serde(default)]
    pub business_hours_only: bool,

    /// Window start hour (default 7)
    pub start_hour: Option<u32>,

    /// Window end hour, exclusive (default 20)
    pub end_hour: Option<u32>,
}

/// Notification settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotificationConfig {
    /// Raise desktop notifications for new and changed tickets
    pub enabled: Option<bool>,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// IPC socket path override
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,
}
