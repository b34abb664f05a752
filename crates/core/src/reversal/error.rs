//! Reversal error types.
//!
//! `StoreError` is what storage collaborators report; `ReversalError` is the
//! contract the engine exposes to its callers.

use safar_shared::AppError;
use thiserror::Error;

/// Errors reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed to execute a statement.
    #[error("{0}")]
    Backend(String),

    /// The stored data contradicts what the engine just observed.
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    /// The unit of work was already committed or rolled back.
    #[error("Unit of work is already closed")]
    Closed,
}

/// Errors returned by the reversal engine.
#[derive(Debug, Error)]
pub enum ReversalError {
    /// The identifier is syntactically malformed.
    #[error("Invalid transaction id: {0}")]
    InvalidId(String),

    /// No reversible transaction matches the identifier.
    #[error("Transaction {0} not found")]
    NotFound(String),

    /// The unit of work failed and was rolled back.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReversalError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidId(_) => 400,
            Self::NotFound(_) => 404,
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "INVALID_TRANSACTION_ID",
            Self::NotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if the caller may safely retry the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<StoreError> for ReversalError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<ReversalError> for AppError {
    fn from(err: ReversalError) -> Self {
        match err {
            ReversalError::InvalidId(_) => Self::Validation("Invalid transaction id".to_string()),
            ReversalError::NotFound(_) => Self::NotFound("Transaction not found".to_string()),
            ReversalError::Storage(msg) => Self::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id_error() {
        let err = ReversalError::InvalidId("bad id".to_string());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_TRANSACTION_ID");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_error() {
        let err = ReversalError::NotFound("TRX-1".to_string());
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "TRANSACTION_NOT_FOUND");
        assert!(err.to_string().contains("TRX-1"));
    }

    #[test]
    fn test_store_error_becomes_storage() {
        let err: ReversalError = StoreError::Backend("connection reset".to_string()).into();
        assert_eq!(err.status_code(), 500);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Storage error: connection reset");
    }

    #[test]
    fn test_app_error_messages() {
        let app: AppError = ReversalError::NotFound("x".to_string()).into();
        assert_eq!(app.status_code(), 404);
        assert_eq!(app.message(), "Transaction not found");

        let app: AppError = ReversalError::InvalidId("x y".to_string()).into();
        assert_eq!(app.status_code(), 400);

        let app: AppError =
            ReversalError::Storage("Inconsistent state: no rows deleted".to_string()).into();
        assert_eq!(app.status_code(), 500);
        assert_eq!(app.message(), "Inconsistent state: no rows deleted");
    }
}
