//! Datastore error types.

use thiserror::Error;

/// Datastore errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing matched the request.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request cannot be evaluated as given.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// SQLx error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a not found error with context.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for datastore operations.
pub type StoreResult<T> = Result<T, StoreError>;
