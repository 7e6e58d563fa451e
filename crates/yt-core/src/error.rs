//! # AppError
//!
//! Centralized error handling for the Yatube crates.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all yt-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Group, Post, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., blank post text, unknown group)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Auth failure (e.g., bad credentials)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate username or group slug)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain on one line
        AppError::Internal(format!("{err:#}"))
    }
}

/// A specialized Result type for Yatube logic.
pub type Result<T> = std::result::Result<T, AppError>;
