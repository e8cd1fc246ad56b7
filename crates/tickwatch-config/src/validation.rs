//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Portal URL is empty")]
    EmptyPortalUrl,

    #[error("Portal URL '{0}' is not http(s)")]
    InvalidPortalUrl(String),

    #[error("check_interval_minutes must be at least 1 (got {0})")]
    IntervalTooShort(u32),

    #[error("Business hours {start}..{end} are invalid (need start < end <= 24)")]
    InvalidBusinessHours { start: u32, end: u32 },

    #[error("Status filter entry is empty")]
    EmptyStatusFilter,
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.portal.url.trim().is_empty() {
        errors.push(ValidationError::EmptyPortalUrl);
    } else if !config.portal.url.starts_with("http://") && !config.portal.url.starts_with("https://")
    {
        errors.push(ValidationError::InvalidPortalUrl(config.portal.url.clone()));
    }

    if let Some(interval) = config.monitor.check_interval_minutes {
        if interval < 1 {
            errors.push(ValidationError::IntervalTooShort(interval));
        }
    }

    let start = config.monitor.start_hour.unwrap_or(7);
    let end = config.monitor.end_hour.unwrap_or(20);
    if start >= end || end > 24 {
        errors.push(ValidationError::InvalidBusinessHours { start, end });
    }

    for status in &config.portal.status_filter {
        if status.trim().is_empty() {
            errors.push(ValidationError::EmptyStatusFilter);
        }
    }

    errors
}
