//! banking-testkit - Command-line entry point
//!
//! Wraps the library's operations as subcommands so CI can call them around
//! a browser test run:
//!
//! - `validate-env` - check `.env` and required variables
//! - `setup` - create the database, tables and sample data
//! - `validate-db` - ping the database
//! - `seed` / `clear` - load or remove the known fixtures
//! - `cleanup` - restore baseline accounts and purge old test results
//! - `upload-results` - publish report logs to TestRail
//!
//! Any failure exits with a non-zero status.

use std::path::PathBuf;

use anyhow::{Context, bail};
use banking_testkit::{
    config::{DbConfig, TestRailConfig, validate_environment},
    db::Database,
    services::{fixture_service, schema_service, testrail_service},
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "banking-testkit",
    version,
    about = "Database fixtures and TestRail reporting for the banking UI test suite"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that every required environment variable is set and well-formed
    ValidateEnv {
        /// Directory holding .env (and .env.example)
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Create the database and tables, then insert sample data
    Setup {
        /// Create the schema only
        #[arg(long)]
        no_sample_data: bool,
    },

    /// Verify that the database accepts connections
    ValidateDb,

    /// Insert the known test customers and accounts
    Seed,

    /// Delete all transactions, accounts and customers
    Clear,

    /// Restore baseline accounts and purge old test results
    Cleanup {
        /// Keep test results newer than this many days
        #[arg(long, default_value_t = 7)]
        retention_days: u32,
    },

    /// Upload results parsed from report logs to a new TestRail run
    UploadResults {
        /// Directory containing *.log report files
        #[arg(long, env = "REPORTS_DIR", default_value = "reports")]
        reports_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::ValidateEnv { dir } => validate_env(dir),
        Command::UploadResults { reports_dir } => upload_results(reports_dir).await,
        Command::Setup { no_sample_data } => {
            with_database(DbTask::Setup {
                sample_data: !no_sample_data,
            })
            .await
        }
        Command::ValidateDb => with_database(DbTask::Validate).await,
        Command::Seed => with_database(DbTask::Seed).await,
        Command::Clear => with_database(DbTask::Clear).await,
        Command::Cleanup { retention_days } => {
            with_database(DbTask::Cleanup { retention_days }).await
        }
    }
}

/// Subcommands that need a database pool.
#[derive(Debug, Clone, Copy)]
enum DbTask {
    Setup { sample_data: bool },
    Validate,
    Seed,
    Clear,
    Cleanup { retention_days: u32 },
}

/// Open the pool, run `task`, and close the pool on both outcomes.
async fn with_database(task: DbTask) -> anyhow::Result<()> {
    let config = DbConfig::from_env().context("Failed to load database configuration")?;
    tracing::info!("Configuration loaded");

    if let DbTask::Setup { .. } = task {
        schema_service::create_database(&config).await?;
    }

    let db = Database::open(&config).await?;
    let result = run_task(&db, task).await;
    db.close().await;
    result
}

fn validate_env(dir: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Validating environment configuration...");
    let report = validate_environment(&dir)?;

    for name in &report.configured {
        tracing::info!("{name} is configured");
    }
    for name in &report.optional_unset {
        tracing::warn!("{name} not configured (using defaults)");
    }

    let report = report.into_result()?;
    tracing::info!(
        configured = report.configured.len(),
        "All environment variables are properly configured"
    );
    Ok(())
}

async fn run_task(db: &Database, task: DbTask) -> anyhow::Result<()> {
    match task {
        DbTask::Setup { sample_data } => {
            schema_service::run_migrations(db).await?;
            if sample_data {
                schema_service::insert_sample_data(db).await?;
            }
            tracing::info!("Database setup completed successfully");
        }
        DbTask::Validate => {
            if !db.verify_connection().await {
                bail!("Database validation failed");
            }
        }
        DbTask::Seed => fixture_service::seed_test_data(db).await?,
        DbTask::Clear => fixture_service::clear_test_data(db).await?,
        DbTask::Cleanup { retention_days } => {
            fixture_service::reset_account_balances(db).await?;
            fixture_service::purge_stale_test_results(db, retention_days).await?;
            tracing::info!("Database cleanup completed successfully");
        }
    }

    Ok(())
}

async fn upload_results(reports_dir: PathBuf) -> anyhow::Result<()> {
    let config = TestRailConfig::from_env().context("Failed to load TestRail configuration")?;
    let client = testrail_service::TestRailClient::new(&config)?;

    match testrail_service::upload_results(&client, &reports_dir).await? {
        Some(run_id) => tracing::info!(run_id, "TestRail upload completed"),
        None => tracing::warn!("Nothing uploaded"),
    }

    Ok(())
}
