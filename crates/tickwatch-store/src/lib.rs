//! Persistence layer for tickwatchd
//!
//! Provides:
//! - Monitoring settings (seeded from the config file, updated over IPC)
//! - The alert set (replaced wholesale on every successful poll)
//! - Last-checked timestamp ("last attempted", not "last successful")
//! - Business-hours pause marker (survives restarts)
//! - Per-ticket read marks (survive alert replacement)

mod sqlite;
mod traits;

pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
