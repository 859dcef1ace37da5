//! Error types for pos
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, validation, missing record)
//! - 3: Blocked (destructive action without confirmation)
//! - 4: Operation failed (storage error)
//! - 5: Partial failure (multi-step operation left incomplete)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the pos CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
    pub const PARTIAL_FAILURE: i32 = 5;
}

/// Main error type for pos operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Ambiguous id: {0}")]
    AmbiguousId(String),

    // Blocked (exit code 3)
    #[error("Confirmation required to {0} (pass --yes)")]
    ConfirmationRequired(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Storage write failed: {0}")]
    Backend(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    // Partial failures (exit code 5)
    #[error("{operation} partially failed ({succeeded} succeeded, {failed} failed): {reason}")]
    PartialFailure {
        operation: String,
        succeeded: usize,
        failed: usize,
        reason: String,
    },
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::Validation(_)
            | Error::NotFound { .. }
            | Error::AmbiguousId(_) => exit_codes::USER_ERROR,

            Error::ConfirmationRequired(_) => exit_codes::BLOCKED,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::Backend(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,

            Error::PartialFailure { .. } => exit_codes::PARTIAL_FAILURE,
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Structured details for machine-readable output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound { kind, id } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
            })),
            Error::PartialFailure {
                operation,
                succeeded,
                failed,
                ..
            } => Some(serde_json::json!({
                "operation": operation,
                "succeeded": succeeded,
                "failed": failed,
            })),
            _ => None,
        }
    }
}

/// Result type alias for pos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
