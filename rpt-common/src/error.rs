//! Common error types for the receiving problem-tag core

use std::fmt;
use thiserror::Error;

/// Common result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// SQLite primary result code for constraint failures (SQLITE_CONSTRAINT)
const SQLITE_CONSTRAINT: i32 = 19;
/// SQLite primary result code for an unopenable database file (SQLITE_CANTOPEN)
const SQLITE_CANTOPEN: i32 = 14;

/// Error taxonomy shared by every component
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-correctable input problems; no write was attempted
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Storage rejected a write that passed validation (stale FK, duplicate key)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Storage unreachable; nothing was written
    #[error("Database unavailable: {0}")]
    Connectivity(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored data could not be interpreted
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Single-message validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Validation(ValidationErrors::single(message))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::NotFound("row not found".to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Error::Connectivity(err.to_string()),
            sqlx::Error::Database(db_err) => {
                let primary = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                if !matches!(db_err.kind(), sqlx::error::ErrorKind::Other)
                    || primary == Some(SQLITE_CONSTRAINT)
                {
                    Error::ConstraintViolation(db_err.message().to_string())
                } else if primary == Some(SQLITE_CANTOPEN) {
                    Error::Connectivity(db_err.message().to_string())
                } else {
                    Error::Database(err)
                }
            }
            _ => Error::Database(err),
        }
    }
}

/// Every validation failure found in one pass over a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// `Ok(())` when nothing was collected, otherwise `Error::Validation`
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.push("PO# is required.");
        errors.push("Line 1: COLOR is required.");

        let err = errors.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: PO# is required.; Line 1: COLOR is required."
        );
    }

    #[test]
    fn test_empty_validation_errors_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_pool_closed_maps_to_connectivity() {
        let err: Error = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, Error::Connectivity(_)));
    }
}
