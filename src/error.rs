//! Error types shared by the database layer and the TestRail uploader.
//!
//! Every fallible operation in this crate returns `Result<T, AppError>`.
//! The variants follow the failure classes callers are expected to handle:
//!
//! - **Acquisition**: the pool is closed, exhausted, or the server is unreachable
//! - **Execution**: a statement failed (constraint violation, syntax, deadlock)
//! - **Remote API**: TestRail returned an error or could not be reached
//! - **Setup**: configuration, migrations, or local files
//!
//! Rollback failures are not a variant. They are logged where they happen and
//! the error that triggered the rollback is returned instead.

/// Application-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A connection could not be checked out of the pool.
    ///
    /// Covers an exhausted pool (acquire timeout) and an unreachable server.
    #[error("Failed to acquire database connection: {0}")]
    Acquire(sqlx::Error),

    /// `acquire()` was called after the pool was closed.
    ///
    /// A closed pool is never reopened implicitly.
    #[error("Database pool is closed")]
    PoolClosed,

    /// A statement failed to execute.
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, so `?` on a
    /// query result lands here. Acquisition errors are mapped explicitly to
    /// `Acquire` before they reach a `?`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the schema migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The TestRail request could not be sent or its response not decoded.
    #[error("TestRail request failed: {0}")]
    TestRail(#[from] reqwest::Error),

    /// TestRail answered with a non-success status code.
    #[error("TestRail returned {status}: {body}")]
    TestRailStatus { status: u16, body: String },

    /// Environment variables could not be deserialized into a config struct.
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Required environment variables are missing or malformed.
    ///
    /// The Vec holds one human-readable problem per entry.
    #[error("Invalid environment: {}", .0.join("; "))]
    InvalidEnvironment(Vec<String>),

    /// Reading reports or env files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether the failure happened before any statement ran.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, AppError::Acquire(_) | AppError::PoolClosed)
    }
}
