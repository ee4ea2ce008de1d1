//! Error types and handling module.
//!
//! Defines all application-specific error types and conversions.

use rmcp::ErrorData as McpError;
use thiserror::Error;

use crate::types::Location;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport errors (connection refused, timeouts, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered but rejected the request.
    #[error("Backend API error: {0}")]
    Api(String),

    /// A backend task finished without a result.
    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: u64, message: String },

    /// A payload did not have the expected shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An account with the same name already exists for the location.
    #[error("Exchange account '{name}' already exists for {location}")]
    DuplicateAccount { name: String, location: Location },

    /// An account that must exist was not found.
    ///
    /// Signals that the in-memory account list is out of sync with the
    /// backend. Never contained by the registry operations.
    #[error("Invariant violation: exchange account '{name}' on {location} is not registered")]
    InvariantViolation { name: String, location: Location },
}

impl AppError {
    /// Whether the error must escape the registry's error containment.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::InvariantViolation { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Parse(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(err: rust_decimal::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Parse(_)
            | AppError::Validation(_)
            | AppError::DuplicateAccount { .. } => McpError::invalid_params(err.to_string(), None),
            AppError::Config(_) => McpError::invalid_request(err.to_string(), None),
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
