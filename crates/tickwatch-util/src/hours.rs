//! Business-hours window
//!
//! Polling is gated on a weekday time window: Monday through Friday,
//! hour in `[start_hour, end_hour)`. The end bound is exclusive so a
//! 7-to-20 window closes at exactly 20:00.

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Default window start (07:00 local)
pub const DEFAULT_START_HOUR: u32 = 7;

/// Default window end (20:00 local, exclusive)
pub const DEFAULT_END_HOUR: u32 = 20;

/// A weekday hour window during which polling is permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
        }
    }
}

impl BusinessHours {
    /// Build a window, rejecting inverted or out-of-range bounds
    pub fn new(start_hour: u32, end_hour: u32) -> Option<Self> {
        if start_hour < end_hour && end_hour <= 24 {
            Some(Self {
                start_hour,
                end_hour,
            })
        } else {
            None
        }
    }

    /// Check if the given local datetime falls within business hours
    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        if !is_weekday(dt.weekday()) {
            return false;
        }
        let hour = dt.hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

fn is_weekday(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}
