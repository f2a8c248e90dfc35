//! Schema service - Creating the test database from scratch.
//!
//! Used once per environment, before any fixtures are seeded:
//! 1. `create_database` on a server-level connection
//! 2. `run_migrations` on the pool (tables from `migrations/`)
//! 3. `insert_sample_data` for the rows the demo site expects

use rust_decimal::Decimal;
use sqlx::{ConnectOptions, Connection, Executor};

use crate::{
    config::DbConfig,
    db::{Database, Statement},
    error::AppError,
    services::fixture_service::{baseline_accounts, insert_account},
};

/// Whether `name` can be spliced into DDL as a database identifier.
///
/// `CREATE DATABASE` cannot take a bind parameter, so the name is restricted
/// to ASCII letters, digits and underscores.
pub fn is_valid_database_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Create the configured database if it does not exist.
///
/// Connects without a default database, since the target may not exist yet.
///
/// # Errors
///
/// - `InvalidEnvironment`: `DB_NAME` is not a plain identifier
/// - `Acquire`: cannot reach the server
/// - `Database`: the server refused the statement
pub async fn create_database(config: &DbConfig) -> Result<(), AppError> {
    if !is_valid_database_name(&config.name) {
        return Err(AppError::InvalidEnvironment(vec![format!(
            "DB_NAME '{}' must contain only letters, digits and underscores",
            config.name
        )]));
    }

    let mut conn = config
        .server_options()
        .connect()
        .await
        .map_err(AppError::Acquire)?;

    tracing::info!(database = %config.name, "Creating database");
    conn.execute(format!("CREATE DATABASE IF NOT EXISTS `{}`", config.name).as_str())
        .await?;

    conn.close().await?;
    Ok(())
}

/// Apply the SQL files in `migrations/`.
///
/// Applied migrations are tracked in `_sqlx_migrations`, so running this
/// against an initialized database is a no-op.
pub async fn run_migrations(db: &Database) -> Result<(), AppError> {
    // The macro embeds ./migrations at compile time
    sqlx::migrate!("./migrations").run(db.pool()).await?;
    tracing::info!("Database tables created successfully");
    Ok(())
}

/// Customers inserted by `insert_sample_data`, with ids assigned by the server.
pub const SAMPLE_CUSTOMERS: [(&str, &str, &str, &str); 3] = [
    ("Harry", "Potter", "harry@hogwarts.com", "1001"),
    ("Ron", "Weasly", "ron@hogwarts.com", "1002"),
    ("Hermoine", "Granger", "hermoine@hogwarts.com", "1003"),
];

/// Statements run by `insert_sample_data`.
pub fn sample_data_statements() -> Vec<Statement> {
    SAMPLE_CUSTOMERS
        .iter()
        .map(|(first, last, email, phone)| {
            Statement::new(
                "INSERT INTO customers (first_name, last_name, email, phone) VALUES (?, ?, ?, ?)",
            )
            .bind(*first)
            .bind(*last)
            .bind(*email)
            .bind(*phone)
        })
        .chain(baseline_accounts().iter().map(insert_account))
        .collect()
}

/// Insert the sample customers and their accounts in one transaction.
///
/// Expects empty tables: on a fresh schema the customers receive ids 1-3,
/// which the sample accounts refer to.
pub async fn insert_sample_data(db: &Database) -> Result<(), AppError> {
    tracing::info!("Inserting sample data...");
    db.execute_transaction(&sample_data_statements()).await?;

    let total: Decimal = baseline_accounts().iter().map(|a| a.balance).sum();
    tracing::info!(
        customers = SAMPLE_CUSTOMERS.len(),
        %total,
        "Sample data inserted successfully"
    );
    Ok(())
}
