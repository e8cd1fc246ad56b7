//! Event types for tickwatchd -> client streaming

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};

use crate::{MonitorSnapshot, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: tickwatch_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full state snapshot (sent on subscribe and major changes)
    StateChanged(MonitorSnapshot),

    /// A poll changed the persisted alert set; the UI should refetch
    AlertsUpdated {
        added: usize,
        status_changed: usize,
    },

    /// Monitoring was turned on or off (pause for business hours does
    /// not flip this; it shows up in the snapshot instead)
    MonitoringChanged {
        monitoring: bool,
    },

    /// Login against the portal failed
    LoginError {
        message: String,
    },

    /// A poll cycle failed to scrape the grid
    ScrapingError {
        message: String,
    },

    /// Service is shutting down
    Shutdown,
}
