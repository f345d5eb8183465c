//! Error types for stock_tracker

use chrono::{DateTime, Utc};
use stock_common::{EntityId, FetchError};
use std::fmt;

/// Unified error type for stock_tracker operations
#[derive(Debug)]
pub enum TrackerError {
    /// Log store read or append failed
    Storage(rusqlite::Error),
    /// Fetching or extracting a product page failed
    Fetch(FetchError),
    /// File I/O error (config, state files)
    Io(std::io::Error),
    /// Invalid configuration
    Config(String),
    /// Entity id string not of the form `"<product>: <item>"`
    InvalidEntityId(String),
    /// Watch term is not a valid regular expression
    InvalidPattern(regex::Error),
    /// No log rows exist for the entity
    EmptyHistory(EntityId),
    /// A row is timestamped before its predecessor
    NonMonotonicLog {
        entity: EntityId,
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
    /// Notification could not be delivered
    Notification(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Storage(e) => write!(f, "Storage error: {}", e),
            TrackerError::Fetch(e) => write!(f, "Fetch error: {}", e),
            TrackerError::Io(e) => write!(f, "I/O error: {}", e),
            TrackerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            TrackerError::InvalidEntityId(id) => {
                write!(f, "Invalid item id '{}', expected '<product>: <item>'", id)
            }
            TrackerError::InvalidPattern(e) => write!(f, "Invalid watch pattern: {}", e),
            TrackerError::EmptyHistory(id) => write!(f, "No stock history for {}", id),
            TrackerError::NonMonotonicLog {
                entity,
                index,
                previous,
                current,
            } => write!(
                f,
                "Stock log for {} goes back in time at row {}: {} is before {}",
                entity, index, current, previous
            ),
            TrackerError::Notification(msg) => write!(f, "Notification failed: {}", msg),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Storage(e) => Some(e),
            TrackerError::Fetch(e) => Some(e),
            TrackerError::Io(e) => Some(e),
            TrackerError::InvalidPattern(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::Storage(err)
    }
}

impl From<FetchError> for TrackerError {
    fn from(err: FetchError) -> Self {
        TrackerError::Fetch(err)
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::Io(err)
    }
}

impl From<regex::Error> for TrackerError {
    fn from(err: regex::Error) -> Self {
        TrackerError::InvalidPattern(err)
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Fetch(FetchError::Network(err))
    }
}

/// Result alias for stock_tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
