//! Validated settings bundle

use crate::schema::RawConfig;
use std::path::PathBuf;
use tickwatch_api::Settings;
use tickwatch_util::BusinessHours;

/// Validated settings ready for use by the daemon: the user-editable
/// monitoring settings plus daemon-level paths.
#[derive(Debug, Clone)]
pub struct SettingsBundle {
    /// Settings seeded into the store (and from then on owned by it)
    pub settings: Settings,

    /// Daemon wiring
    pub daemon: DaemonConfig,
}

impl SettingsBundle {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let defaults = Settings::default();

        let business_hours = BusinessHours::new(
            raw.monitor.start_hour.unwrap_or(defaults.business_hours.start_hour),
            raw.monitor.end_hour.unwrap_or(defaults.business_hours.end_hour),
        )
        .unwrap_or_default();

        let settings = Settings {
            portal_url: raw.portal.url,
            username: raw.portal.username,
            password: raw.portal.password,
            check_interval_minutes: raw
                .monitor
                .check_interval_minutes
                .unwrap_or(defaults.check_interval_minutes),
            business_hours_only: raw.monitor.business_hours_only,
            business_hours,
            enable_notifications: raw
                .notifications
                .enabled
                .unwrap_or(defaults.enable_notifications),
            status_filter: raw.portal.status_filter,
            lookback_days: raw.portal.lookback_days,
        };

        Self {
            settings,
            daemon: DaemonConfig::from_raw(raw.daemon),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl DaemonConfig {
    fn from_raw(raw: crate::schema::RawDaemonConfig) -> Self {
        Self {
            socket_path: raw
                .socket_path
                .unwrap_or_else(tickwatch_util::socket_path_without_env),
            data_dir: raw
                .data_dir
                .unwrap_or_else(tickwatch_util::data_dir_without_env),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: tickwatch_util::socket_path_without_env(),
            data_dir: tickwatch_util::data_dir_without_env(),
        }
    }
}
