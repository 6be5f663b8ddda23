// src/errors.rs

use crate::services::face_check::FaceCheckFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Input errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Face check failed: {0}")]
    FaceCheckFailed(FaceCheckFailure),

    // Concurrency errors
    #[error("Stale state: {0}")]
    StaleState(String),

    // Duration sanity errors
    #[error("Data anomaly: {0}")]
    DataAnomaly(String),

    // Store errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Outbound collaborators
    #[error("External service error: {0}")]
    External(String),

    // Business logic errors
    #[error("Payroll run {0} is finalised and cannot be modified")]
    PayrollFinalised(String),

    // Startup errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Error kind name as reported to collaborators and operators.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::PayrollFinalised(_) => {
                "InputValidation"
            }
            AppError::FaceCheckFailed(_) => "FaceCheckFailed",
            AppError::StaleState(_) => "StaleState",
            AppError::DataAnomaly(_) => "DataAnomaly",
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Store(_)
            | AppError::NotFound(_) => "StoreFailure",
            AppError::External(_) => "ExternalService",
            AppError::Config(_) => "ConfigError",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Only a lost serialisation race is worth retrying, after refetching state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StaleState(_))
    }
}

// Convenience alias
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_error_taxonomy() {
        assert_eq!(AppError::Validation("x".into()).kind(), "InputValidation");
        assert_eq!(AppError::StaleState("x".into()).kind(), "StaleState");
        assert_eq!(AppError::Store("x".into()).kind(), "StoreFailure");
        assert_eq!(AppError::Config("x".into()).kind(), "ConfigError");
        assert_eq!(AppError::Internal("x".into()).kind(), "Internal");
        assert_eq!(
            AppError::FaceCheckFailed(FaceCheckFailure::TooBlurry { variance: 3.0 }).kind(),
            "FaceCheckFailed"
        );
    }

    #[test]
    fn only_stale_state_is_retryable() {
        assert!(AppError::StaleState("lost race".into()).is_retryable());
        assert!(!AppError::Validation("bad".into()).is_retryable());
        assert!(!AppError::Store("down".into()).is_retryable());
    }
}
