//! Error types for nodemeter.

use thiserror::Error;

/// Errors raised by nodemeter
#[derive(Error, Debug)]
pub enum NodemeterError {
    /// Invalid role, metric identifier, period or input shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Metric store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Metric store locked by another process; retrying may succeed
    #[error("Storage busy: {0}")]
    StorageBusy(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// File or stream failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for nodemeter operations
pub type Result<T> = std::result::Result<T, NodemeterError>;

impl NodemeterError {
    /// Creates a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if the caller may retry the operation later.
    ///
    /// Only a busy store qualifies; every other failure is either a
    /// programming defect or a fatal storage condition.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StorageBusy(_))
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Storage(_) | Self::StorageBusy(_) => "storage",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<rusqlite::Error> for NodemeterError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                Self::StorageBusy(err.to_string())
            },
            _ => Self::Storage(err.to_string()),
        }
    }
}
