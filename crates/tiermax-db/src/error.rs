//! # Error Types
//!
//! Failures of the persistence layer. None of these reach the shopper: a
//! host that can't load a snapshot keeps its own default maximum.
//!
//! ```text
//! sqlx::Error ───────────────┐
//! MigrateError ──────────────┼──► DbError ──► host (log, keep default max)
//! ValidationError (catalog) ─┘
//!
//! io / toml errors ──────────────► ConfigError ──► host startup
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;
use tiermax_core::ValidationError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A plan or membership was rejected before reaching SQLite.
    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),

    /// Primary key or unique index hit, e.g. a membership imported twice.
    #[error("Already exists: {constraint}")]
    UniqueViolation { constraint: String },

    /// A membership names a plan that was never imported.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The database file couldn't be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected a statement (CHECK constraints, missing tables).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Anything else sqlx reports.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        // "UNIQUE constraint failed: <table>.<column>"
                        constraint: message
                            .rsplit(": ")
                            .next()
                            .unwrap_or_default()
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Config Error
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file couldn't be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file isn't valid TOML for [`crate::config::TierMaxConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting holds an unusable value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
