//! Error types for arsip.
//!
//! Every failure in the record manager maps onto one of four user-facing
//! categories: validation errors and lookup failures block the action with no
//! side effect, while resolution and conversion failures degrade the output
//! but never abort it. The remaining variants cover the ambient plumbing
//! (configuration, preferences database, filesystem).

use std::path::PathBuf;
use thiserror::Error;

use crate::record::RecordId;

/// The main error type for arsip operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Record Errors ===
    /// A required form field was empty or whitespace-only.
    #[error("required field '{field}' is empty (all fields except the attachment are required)")]
    Validation {
        /// Name of the missing field.
        field: &'static str,
    },

    /// No record exists with the given id.
    #[error("record {id} not found")]
    RecordNotFound {
        /// The id that was looked up.
        id: RecordId,
    },

    /// A positional index did not map to a record.
    #[error("row {index} is out of range (store holds {len} records)")]
    RowOutOfRange {
        /// The zero-based index that was requested.
        index: usize,
        /// Number of records in the store at the time.
        len: usize,
    },

    // === Attachment Errors ===
    /// A transient display handle could not be created.
    #[error("failed to create display handle: {message}")]
    HandleCreate {
        /// Description of what went wrong.
        message: String,
    },

    // === Print Errors ===
    /// The print surface could not be opened or printed.
    #[error("print failed: {message}")]
    Print {
        /// Description of what went wrong.
        message: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the preferences database.
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

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for arsip operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new print error.
    #[must_use]
    pub fn print(message: impl Into<String>) -> Self {
        Self::Print {
            message: message.into(),
        }
    }

    /// Create a new handle creation error.
    #[must_use]
    pub fn handle_create(message: impl Into<String>) -> Self {
        Self::HandleCreate {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a missing required field.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error means the addressed record does not exist.
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. } | Self::RowOutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::Validation { field: "title" };
        let msg = err.to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("except the attachment"));
    }

    #[test]
    fn test_is_validation_error() {
        assert!(Error::Validation { field: "date" }.is_validation_error());
        assert!(!Error::internal("x").is_validation_error());
    }

    #[test]
    fn test_is_lookup_failure() {
        assert!(Error::RecordNotFound { id: RecordId::new(4) }.is_lookup_failure());
        assert!(Error::RowOutOfRange { index: 3, len: 1 }.is_lookup_failure());
        assert!(!Error::Validation { field: "title" }.is_lookup_failure());
    }

    #[test]
    fn test_record_not_found_display() {
        let err = Error::RecordNotFound { id: RecordId::new(12) };
        assert_eq!(err.to_string(), "record #12 not found");
    }

    #[test]
    fn test_row_out_of_range_display() {
        let err = Error::RowOutOfRange { index: 5, len: 2 };
        let msg = err.to_string();
        assert!(msg.contains("row 5"));
        assert!(msg.contains("2 records"));
    }

    #[test]
    fn test_print_error() {
        let err = Error::print("lp exited with status 1");
        assert_eq!(err.to_string(), "print failed: lp exited with status 1");
    }

    #[test]
    fn test_handle_create_error() {
        let err = Error::handle_create("spool dir is read-only");
        assert!(err.to_string().contains("spool dir is read-only"));
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
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "pdf_settle_ms must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("pdf_settle_ms"));
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
