/// SimpleDb Error Module
///
/// This module defines the error taxonomy for the connection manager.
/// Driver-level failures are captured as `DriverError` and wrapped into
/// `DbError` variants that name the operation that failed.
use std::time::Duration;
use thiserror::Error;

use crate::core::db::ContextId;

/// Failure raised by a database driver.
///
/// `Sqlite` carries errors from the bundled SQLite driver; `Other` is for
/// drivers that do not expose a structured error type.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

/// Error type for every public operation of the crate.
#[derive(Error, Debug)]
pub enum DbError {
    /// No connection became available within the pool's bounded wait
    #[error("Connection pool exhausted: no connection available after {waited:?}")]
    PoolExhausted { waited: Duration },

    /// A transaction-ending or close operation was called on an unbound session
    #[error("No active session: context {context} holds no connection")]
    NoActiveSession { context: ContextId },

    /// The driver failed to prepare or execute a statement
    #[error("Statement execution failed for `{sql}`: {source}")]
    StatementExecutionFailed {
        sql: String,
        #[source]
        source: DriverError,
    },

    #[error("Failed to start transaction: {source}")]
    TransactionStartFailed {
        #[source]
        source: DriverError,
    },

    #[error("Commit failed: {source}")]
    CommitFailed {
        #[source]
        source: DriverError,
    },

    #[error("Rollback failed: {source}")]
    RollbackFailed {
        #[source]
        source: DriverError,
    },

    /// Opening a connection during pool construction failed
    #[error("Connection error: {0}")]
    Connect(#[source] DriverError),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DbError {
    /// Returns the underlying driver error, if this error wraps one.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            DbError::StatementExecutionFailed { source, .. }
            | DbError::TransactionStartFailed { source }
            | DbError::CommitFailed { source }
            | DbError::RollbackFailed { source }
            | DbError::Connect(source) => Some(source),
            _ => None,
        }
    }
}

/// Type alias for Result to use DbError as the error type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Result type returned by `Driver` implementations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
