//! Error types for employee-bench.

use thiserror::Error;

/// Result type for benchmark operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Result type for raw session operations.
pub type DriverResult<T> = core::result::Result<T, DriverError>;

/// Error reported by the underlying database engine.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Embedded engine (SQLite) error
    #[error("SQLite error: {0}")]
    Embedded(#[from] rusqlite::Error),

    /// Server engine (PostgreSQL) error
    #[cfg(feature = "server")]
    #[error("PostgreSQL error: {0}")]
    Server(#[from] postgres::Error),

    /// A statement handle that was never prepared or was already closed
    #[error("Unknown statement handle: {0}")]
    UnknownStatement(usize),

    /// A column could not be decoded as the requested type
    #[error("Column {index}: {message}")]
    Decode { index: usize, message: String },
}

impl DriverError {
    /// Get the SQLSTATE code if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            #[cfg(feature = "server")]
            DriverError::Server(e) => e.code().map(|c| c.code()),
            _ => None,
        }
    }
}

/// Error type for employee-bench.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend unavailable or credentials rejected
    #[error("Connection to {backend} failed: {source}")]
    Connection {
        backend: String,
        #[source]
        source: DriverError,
    },

    /// DDL statement failed
    #[error("Schema statement `{statement}` failed: {source}")]
    Schema {
        statement: &'static str,
        #[source]
        source: DriverError,
    },

    /// Preparing the INSERT statement failed
    #[error("Prepare of `{sql}` failed: {source}")]
    Prepare {
        sql: String,
        #[source]
        source: DriverError,
    },

    /// A row submission, batch flush or commit failed.
    ///
    /// `sid` is the last row attempted, 0 if no row was attempted yet.
    #[error("Insert failed at SID {sid}: {source}")]
    Insert {
        sid: i32,
        #[source]
        source: DriverError,
    },

    /// A read query (count, join, snapshot) failed
    #[error("Query `{sql}` failed: {source}")]
    Query {
        sql: &'static str,
        #[source]
        source: DriverError,
    },

    /// Observed row count differs from the target
    #[error("{phase} count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        phase: &'static str,
        expected: u64,
        actual: u64,
    },

    /// I/O error (scratch directory handling)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid option value or usage
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),
}

impl Error {
    /// Returns true if the scenario ran to completion but produced the wrong cardinality.
    pub fn is_count_mismatch(&self) -> bool {
        matches!(self, Error::CountMismatch { .. })
    }

    /// Get the underlying engine error, if any.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Error::Connection { source, .. }
            | Error::Schema { source, .. }
            | Error::Prepare { source, .. }
            | Error::Insert { source, .. }
            | Error::Query { source, .. } => Some(source),
            _ => None,
        }
    }
}
