//! Shared utilities for tickwatchd
//!
//! This crate provides:
//! - ID types (TicketId, ClientId)
//! - Time utilities (monotonic time, mock wall clock, duration helpers)
//! - Business-hours window
//! - Rate limiting helpers
//! - Default paths for socket, data, and log directories

mod hours;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use hours::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
