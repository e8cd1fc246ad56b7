//! Core events emitted by the engine
//!
//! The daemon translates these into IPC events for subscribed clients.

/// Events emitted by the monitoring engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Monitoring was turned on or off through start/stop
    MonitoringChanged { monitoring: bool },

    /// The business-hours gate paused or resumed polling
    PauseStateChanged { paused: bool },

    /// A successful poll changed the persisted alert set
    AlertsUpdated {
        added: usize,
        status_changed: usize,
    },

    /// Login against the portal failed
    LoginError { message: String },

    /// A poll cycle failed to scrape the grid
    ScrapingError { message: String },
}
