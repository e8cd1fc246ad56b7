//! Monitoring engine for tickwatchd
//!
//! This crate is the heart of tickwatchd, containing:
//! - Portal session management (login, verification, forced rechecks)
//! - Grid scraping through the page automation seam
//! - Change detection against the persisted alert set
//! - Priority classification and sorting
//! - Notification dispatch with a TTL'd handle registry
//! - The monitoring state machine (Stopped / Running / PausedForBusinessHours)

mod classify;
mod diff;
mod dispatch;
mod events;
mod monitor;
mod scrape;
mod scripts;
mod session;
mod wait;

pub use classify::*;
pub use diff::*;
pub use dispatch::*;
pub use events::*;
pub use monitor::*;
pub use scrape::*;
pub use session::*;
