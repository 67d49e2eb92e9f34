//! Shared error type across waypoint crates.

use thiserror::Error;

/// Stable error kinds reported to operators (machine-readable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong shape: not a mapping, not an array where one is required.
    Schema,
    /// Right shape, value out of domain.
    Validation,
    /// Malformed string grammar (rate shorthand, URL, JSON body).
    Parse,
    /// Invalid resolver configuration.
    Config,
}

impl ErrorKind {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Schema => "SCHEMA_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Parse => "PARSE_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, WaypointError>;

/// Unified error type used by core and control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaypointError {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("config error: {0}")]
    Config(String),
}

impl WaypointError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaypointError::Schema(_) => ErrorKind::Schema,
            WaypointError::Validation(_) => ErrorKind::Validation,
            WaypointError::Parse(_) => ErrorKind::Parse,
            WaypointError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        WaypointError::Schema(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        WaypointError::Validation(msg.into())
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        WaypointError::Parse(msg.into())
    }
}
