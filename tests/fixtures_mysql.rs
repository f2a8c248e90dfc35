//! Fixture and executor tests against a real MySQL server.
//!
//! These need a server reachable through the `DB_*` variables (a `.env`
//! file works) and are ignored by default:
//!
//! ```text
//! cargo test --test fixtures_mysql -- --ignored
//! ```
//!
//! The database named by `DB_NAME` is created and migrated if needed, and
//! its fixture tables are wiped by every test. Tests share one database, so
//! they serialize on `DB_LOCK`.

use banking_testkit::{
    config::DbConfig,
    db::{Database, SqlValue, Statement},
    error::AppError,
    models::test_result::{NewTestResult, TestResultRecord},
    services::{fixture_service, schema_service},
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// Take the lock, then return a migrated database with empty fixture tables.
async fn fresh_db() -> (MutexGuard<'static, ()>, Database) {
    let guard = DB_LOCK.lock().await;

    let config = DbConfig::from_env().expect("Failed to load DB_* configuration");
    schema_service::create_database(&config)
        .await
        .expect("Failed to create database");

    let db = Database::open(&config).await.expect("Failed to open pool");
    schema_service::run_migrations(&db)
        .await
        .expect("Failed to run migrations");
    fixture_service::clear_test_data(&db)
        .await
        .expect("Failed to clear fixtures");

    (guard, db)
}

async fn count(db: &Database, table: &str) -> i64 {
    let rows = db
        .execute_query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
        .await
        .expect("Failed to count rows");
    sqlx::Row::get(&rows[0], "n")
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn seeded_rows_read_back_unchanged() {
    let (_guard, db) = fresh_db().await;

    fixture_service::seed_test_data(&db).await.expect("Seeding failed");

    let harry = fixture_service::get_customer(&db, 1)
        .await
        .unwrap()
        .expect("Customer 1 should exist");
    assert_eq!(harry.full_name(), "Harry Potter");
    assert_eq!(harry.email.as_deref(), Some("harry@hogwarts.com"));

    let savings = fixture_service::get_account(&db, 1001)
        .await
        .unwrap()
        .expect("Account 1001 should exist");
    assert_eq!(savings.customer_id, 1);
    assert_eq!(savings.account_type.as_deref(), Some("Savings"));
    assert_eq!(savings.balance, Decimal::from(50_000));

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn balance_update_is_visible_on_next_read() {
    let (_guard, db) = fresh_db().await;
    fixture_service::seed_test_data(&db).await.unwrap();

    let updated = fixture_service::update_balance(&db, 1001, Decimal::from(45_000))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let account = fixture_service::get_account(&db, 1001).await.unwrap().unwrap();
    assert_eq!(account.balance, Decimal::from(45_000));

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn missing_ids_are_not_found_rather_than_errors() {
    let (_guard, db) = fresh_db().await;

    assert_eq!(fixture_service::get_customer(&db, 999_999).await.unwrap(), None);
    assert_eq!(fixture_service::get_account(&db, 999_999).await.unwrap(), None);
    assert_eq!(
        fixture_service::update_balance(&db, 999_999, Decimal::ONE)
            .await
            .unwrap(),
        0
    );

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn failed_statement_rolls_back_the_whole_batch() {
    let (_guard, db) = fresh_db().await;

    let statements = [
        Statement::new("INSERT INTO customers (customer_id, first_name, last_name) VALUES (?, ?, ?)")
            .bind(50)
            .bind("Albus")
            .bind("Dumbledore"),
        Statement::new("INSERT INTO customers (customer_id, first_name VALUES (?, ?"),
    ];

    let err = db.execute_transaction(&statements).await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    assert_eq!(fixture_service::get_customer(&db, 50).await.unwrap(), None);
    assert_eq!(count(&db, "customers").await, 0);

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn seeding_twice_fails_atomically() {
    let (_guard, db) = fresh_db().await;
    fixture_service::seed_test_data(&db).await.unwrap();
    fixture_service::update_balance(&db, 1002, Decimal::from(1)).await.unwrap();

    // Duplicate primary keys on the first insert
    assert!(fixture_service::seed_test_data(&db).await.is_err());

    let checking = fixture_service::get_account(&db, 1002).await.unwrap().unwrap();
    assert_eq!(checking.balance, Decimal::from(1));
    assert_eq!(count(&db, "accounts").await, 2);

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn every_acquired_connection_is_released() {
    let (_guard, db) = fresh_db().await;

    fixture_service::seed_test_data(&db).await.unwrap();
    let _ = db.execute_query("SELECT * FROM no_such_table", &[]).await;
    let _ = db
        .execute_transaction(&[
            Statement::new("UPDATE accounts SET balance = ? WHERE account_id = ?")
                .bind(Decimal::from(10))
                .bind(1001),
            Statement::new("THIS IS NOT SQL"),
        ])
        .await;
    fixture_service::get_account(&db, 1001).await.unwrap();

    let stats = db.lease_stats();
    assert!(stats.acquired() >= 4);
    assert_eq!(stats.acquired(), stats.released());
    assert_eq!(stats.outstanding(), 0);

    db.close().await;
    assert!(matches!(db.acquire().await, Err(AppError::PoolClosed)));
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn clearing_populated_tables_respects_foreign_keys() {
    let (_guard, db) = fresh_db().await;
    fixture_service::seed_test_data(&db).await.unwrap();
    fixture_service::log_transaction(&db, 1001, "Credit", Decimal::from(500))
        .await
        .unwrap();
    fixture_service::log_transaction(&db, 1001, "Debit", Decimal::new(12_550, 2))
        .await
        .unwrap();

    let records = fixture_service::get_transactions(&db, 1001).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].transaction_type.as_deref(), Some("Debit"));
    assert_eq!(records[1].amount, Some(Decimal::new(12_550, 2)));

    fixture_service::clear_test_data(&db).await.expect("Clear failed");

    for table in fixture_service::CLEAR_ORDER {
        assert_eq!(count(&db, table).await, 0, "{table} should be empty");
    }

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn cleanup_restores_baseline_accounts() {
    let (_guard, db) = fresh_db().await;
    db.execute_transaction(&[
        Statement::new("INSERT INTO customers (customer_id, first_name, last_name) VALUES (1, 'Harry', 'Potter')"),
        Statement::new("INSERT INTO customers (customer_id, first_name, last_name) VALUES (2, 'Ron', 'Weasly')"),
        Statement::new("INSERT INTO customers (customer_id, first_name, last_name) VALUES (3, 'Hermoine', 'Granger')"),
    ])
    .await
    .unwrap();

    fixture_service::reset_account_balances(&db).await.unwrap();

    let rows = db
        .execute_query(
            "SELECT SUM(balance) AS total FROM accounts WHERE customer_id = ?",
            &[SqlValue::from(1)],
        )
        .await
        .unwrap();
    let total: Decimal = sqlx::Row::get(&rows[0], "total");
    assert_eq!(total, Decimal::from(75_000));
    assert_eq!(count(&db, "accounts").await, 4);

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn fresh_test_results_survive_the_purge() {
    let (_guard, db) = fresh_db().await;
    db.execute("DELETE FROM test_results", &[]).await.unwrap();

    fixture_service::record_test_result(
        &db,
        &NewTestResult {
            test_name: "should deposit 500".to_string(),
            status: "passed".to_string(),
            execution_time: Some(1_250),
            error_message: None,
        },
    )
    .await
    .unwrap();

    let purged = fixture_service::purge_stale_test_results(&db, 7).await.unwrap();
    assert_eq!(purged, 0);
    assert_eq!(count(&db, "test_results").await, 1);

    let stored: TestResultRecord = db
        .fetch_first_as(
            "SELECT test_id, test_name, status, execution_time, error_message, executed_at \
             FROM test_results",
            &[],
        )
        .await
        .unwrap()
        .expect("Recorded result should be readable");
    assert_eq!(stored.test_name, "should deposit 500");
    assert_eq!(stored.status, "passed");
    assert_eq!(stored.execution_time, Some(1_250));
    assert_eq!(stored.error_message, None);

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn null_columns_read_back_as_none() {
    let (_guard, db) = fresh_db().await;
    fixture_service::seed_test_data(&db).await.unwrap();

    db.execute_transaction(&[
        Statement::new("INSERT INTO accounts (account_id, customer_id, balance) VALUES (?, ?, ?)")
            .bind(1003)
            .bind(2)
            .bind(Decimal::ZERO),
        Statement::new("INSERT INTO transactions (account_id) VALUES (?)").bind(1003),
    ])
    .await
    .unwrap();

    let account = fixture_service::get_account(&db, 1003)
        .await
        .unwrap()
        .expect("Account 1003 should exist");
    assert_eq!(account.account_type, None);

    let records = fixture_service::get_transactions(&db, 1003).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_type, None);
    assert_eq!(records[0].amount, None);

    db.close().await;
}

#[tokio::test]
#[ignore = "requires a MySQL server configured through DB_* variables"]
async fn verify_connection_pings_the_server() {
    let (_guard, db) = fresh_db().await;
    assert!(db.verify_connection().await);
    db.close().await;
}
