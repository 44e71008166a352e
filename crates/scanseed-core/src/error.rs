//! # Error Types
//!
//! Defines `ScanSeedError`, the unified error enum for every failure mode in
//! the ScanSeed pipeline. Profile and type-mapping errors always name the
//! table and field they came from so a bad scan report can be fixed without
//! digging through logs.

use thiserror::Error;

/// All errors that can occur in ScanSeed operations.
#[derive(Error, Debug)]
pub enum ScanSeedError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No database URL provided. ScanSeed looks for a connection in this order:\n  1. --db flag\n  2. DATABASE_URL environment variable\n  3. .env file with DATABASE_URL\n  4. scanseed.toml [database] section\n\nExample: scanseed generate --profile scan.json --db postgres://localhost/fake_cdm")]
    NoDatabaseUrl,

    #[error("Unsupported database scheme '{scheme}'. Supported: postgres://, mysql://, sqlite://")]
    UnsupportedDatabase { scheme: String },

    #[error("Malformed profile for {table}.{field}: {message}")]
    ProfileMalformed {
        table: String,
        field: String,
        message: String,
    },

    #[error("Cannot map declared type '{declared_type}' of {table}.{field} to a column type\n  Supported declared types: Integer, Real, Date, VarChar, Empty")]
    UnmappedType {
        table: String,
        field: String,
        declared_type: String,
    },

    #[error("Failed to load profile from {path}: {message}")]
    ProfileLoad { path: String, message: String },

    #[error("{operation} failed on {table}: {message}\n  SQL: {sql_preview}\n  DB error: {source}")]
    StatementFailed {
        table: String,
        operation: String,
        message: String,
        sql_preview: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{operation} failed on {table}: {message}")]
    SinkFailed {
        table: String,
        operation: String,
        message: String,
    },

    #[error("{operation} failed on {table}: {message}")]
    TableConflict {
        table: String,
        operation: String,
        message: String,
    },

    #[error("{operation} on {table} timed out after {seconds}s")]
    Timeout {
        table: String,
        operation: String,
        seconds: u64,
    },

    #[error("{operation} on {table} gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        table: String,
        operation: String,
        attempts: u32,
        #[source]
        last_error: Box<ScanSeedError>,
    },

    #[error("Generation of {table} was cancelled")]
    Cancelled { table: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

impl ScanSeedError {
    /// Whether retrying the same sink operation could succeed.
    ///
    /// Only transport-level failures qualify. Errors the database reports
    /// about the statement itself (an existing table, a value out of range)
    /// fail identically on every attempt, as do profile and type errors.
    pub fn is_retriable(&self) -> bool {
        match self {
            ScanSeedError::Connection { .. }
            | ScanSeedError::SinkFailed { .. }
            | ScanSeedError::Timeout { .. } => true,
            ScanSeedError::StatementFailed { source, .. } => matches!(
                source,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::Protocol(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanSeedError>;
