//! Error types for flightschool.
//!
//! This module defines all error types used throughout the flightschool crate,
//! providing detailed context for debugging and user-friendly error messages.
//!
//! Row-level import failures are not errors: they are collected as
//! [`crate::import::RowError`] values so a batch can continue.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightschool operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Import Errors ===
    /// The CSV reader or writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the CSV header.
    #[error("missing required column '{column}'")]
    MissingColumn {
        /// Canonical name of the missing column.
        column: &'static str,
    },

    /// A single field could not be parsed.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// The offending raw value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    // === Domain Errors ===
    /// A record violates a domain rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The key that was looked up.
        key: String,
    },

    /// An operation is not allowed in the record's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightschool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Create a new invalid-state error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a new invalid-field error.
    #[must_use]
    pub fn invalid_field(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error indicates a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is caused by bad input data rather than the environment.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidField { .. } | Self::MissingColumn { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::validation("night time exceeds block time");
        assert_eq!(
            err.to_string(),
            "validation failed: night time exceeds block time"
        );

        let err = Error::not_found("aircraft", "YR-ABC");
        assert_eq!(err.to_string(), "aircraft not found: YR-ABC");
    }

    #[test]
    fn test_error_is_not_found() {
        assert!(Error::not_found("user", "a@b.ro").is_not_found());
        assert!(!Error::validation("x").is_not_found());
    }

    #[test]
    fn test_error_is_validation() {
        assert!(Error::validation("bad").is_validation());
        assert!(Error::invalid_field("date", "31.02.2024", "no such day").is_validation());
        assert!(Error::MissingColumn { column: "date" }.is_validation());
        assert!(!Error::internal("bug").is_validation());
    }

    #[test]
    fn test_invalid_field_display() {
        let err = Error::invalid_field("off_block", "25:10", "hour out of range");
        let msg = err.to_string();
        assert!(msg.contains("off_block"));
        assert!(msg.contains("25:10"));
        assert!(msg.contains("hour out of range"));
    }

    #[test]
    fn test_missing_column_display() {
        let err = Error::MissingColumn {
            column: "registration",
        };
        assert_eq!(err.to_string(), "missing required column 'registration'");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = Error::invalid_state("invoice FS-0001 is already fiscal");
        assert!(err.to_string().contains("FS-0001"));
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid delimiter".to_string(),
        };
        assert!(err.to_string().contains("invalid delimiter"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
