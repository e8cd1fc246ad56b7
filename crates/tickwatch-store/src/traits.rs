//! Store trait definitions

use chrono::{DateTime, Local};
use std::collections::HashSet;
use tickwatch_api::{Settings, Ticket};
use tickwatch_util::TicketId;

use crate::StoreResult;

/// Main store trait
pub trait Store: Send + Sync {
    // Settings

    /// Load the persisted settings, if any have been saved
    fn load_settings(&self) -> StoreResult<Option<Settings>>;

    /// Save (replace) the settings
    fn save_settings(&self, settings: &Settings) -> StoreResult<()>;

    // Alert set

    /// Load the persisted alert set. Empty means no poll has ever
    /// persisted anything (or the set was cleared), which drives
    /// first-run notification suppression.
    fn load_alerts(&self) -> StoreResult<Vec<Ticket>>;

    /// Replace the alert set wholesale. Tickets that fell out of the
    /// portal's grid disappear from the persisted set here.
    fn replace_alerts(&self, alerts: &[Ticket]) -> StoreResult<()>;

    /// Drop all persisted alerts
    fn clear_alerts(&self) -> StoreResult<()>;

    // Last-checked timestamp

    /// When a poll cycle last ran (successfully or not)
    fn last_checked(&self) -> StoreResult<Option<DateTime<Local>>>;

    fn set_last_checked(&self, at: DateTime<Local>) -> StoreResult<()>;

    // Business-hours pause marker

    /// Whether monitoring was paused for business hours when the daemon
    /// last ran
    fn is_paused(&self) -> StoreResult<bool>;

    fn set_paused(&self, paused: bool) -> StoreResult<()>;

    // Read marks

    /// Record that the user has seen this ticket
    fn mark_read(&self, id: &TicketId, at: DateTime<Local>) -> StoreResult<()>;

    /// All ticket ids the user has marked read
    fn read_ids(&self) -> StoreResult<HashSet<TicketId>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
