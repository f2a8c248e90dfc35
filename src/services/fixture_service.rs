//! Fixture service - Known database state for UI test runs.
//!
//! This service handles:
//! - Seeding the customers and accounts the test specs log in as
//! - Clearing fixture tables in foreign-key order
//! - Lookups and balance updates used by assertions
//! - Housekeeping of the `test_results` table
//!
//! Nothing here retries. Errors from the executors in `db` are returned as-is.

use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::{
    db::{Database, SqlValue, Statement},
    error::AppError,
    models::{
        account::{Account, NewAccount},
        customer::{Customer, NewCustomer},
        test_result::NewTestResult,
        transaction::TransactionRecord,
    },
};

/// Tables emptied by `clear_test_data`, children before parents.
pub const CLEAR_ORDER: [&str; 3] = ["transactions", "accounts", "customers"];

/// Customers seeded by `seed_test_data`.
pub const TEST_CUSTOMERS: [NewCustomer; 2] = [
    NewCustomer {
        customer_id: 1,
        first_name: "Harry",
        last_name: "Potter",
        email: "harry@hogwarts.com",
    },
    NewCustomer {
        customer_id: 2,
        first_name: "Ron",
        last_name: "Weasly",
        email: "ron@hogwarts.com",
    },
];

/// Accounts seeded by `seed_test_data`. Both belong to customer 1.
pub fn test_accounts() -> Vec<NewAccount> {
    vec![
        NewAccount {
            account_id: Some(1001),
            customer_id: 1,
            account_type: "Savings",
            balance: Decimal::from(50_000),
        },
        NewAccount {
            account_id: Some(1002),
            customer_id: 1,
            account_type: "Checking",
            balance: Decimal::from(25_000),
        },
    ]
}

/// Accounts restored by `reset_account_balances`, with server-assigned ids.
pub fn baseline_accounts() -> Vec<NewAccount> {
    [
        (1, "Savings", 50_000),
        (1, "Checking", 25_000),
        (2, "Savings", 35_000),
        (3, "Checking", 60_000),
    ]
    .into_iter()
    .map(|(customer_id, account_type, balance)| NewAccount {
        account_id: None,
        customer_id,
        account_type,
        balance: Decimal::from(balance),
    })
    .collect()
}

pub(crate) fn insert_customer(customer: &NewCustomer) -> Statement {
    Statement::new(
        "INSERT INTO customers (customer_id, first_name, last_name, email) VALUES (?, ?, ?, ?)",
    )
    .bind(customer.customer_id)
    .bind(customer.first_name)
    .bind(customer.last_name)
    .bind(customer.email)
}

pub(crate) fn insert_account(account: &NewAccount) -> Statement {
    let statement = match account.account_id {
        Some(id) => Statement::new(
            "INSERT INTO accounts (account_id, customer_id, account_type, balance) VALUES (?, ?, ?, ?)",
        )
        .bind(id),
        None => Statement::new(
            "INSERT INTO accounts (customer_id, account_type, balance) VALUES (?, ?, ?)",
        ),
    };

    statement
        .bind(account.customer_id)
        .bind(account.account_type)
        .bind(account.balance)
}

/// Statements run by `seed_test_data`: customers first, then their accounts.
pub fn seed_statements() -> Vec<Statement> {
    TEST_CUSTOMERS
        .iter()
        .map(insert_customer)
        .chain(test_accounts().iter().map(insert_account))
        .collect()
}

/// Insert the known customers and accounts in a single transaction.
///
/// # Errors
///
/// - `Database`: an insert failed (e.g. the rows already exist); nothing was written
/// - `Acquire` / `PoolClosed`: no connection
pub async fn seed_test_data(db: &Database) -> Result<(), AppError> {
    tracing::info!("Setting up test data...");
    db.execute_transaction(&seed_statements()).await?;
    tracing::info!("Test data setup completed");
    Ok(())
}

/// Empty the fixture tables in `CLEAR_ORDER`.
///
/// Each table is one `DELETE` on its own connection checkout. If a delete
/// fails the tables before it stay cleared and the error is returned.
pub async fn clear_test_data(db: &Database) -> Result<(), AppError> {
    tracing::info!("Clearing test data...");

    for table in CLEAR_ORDER {
        let deleted = db.execute(&format!("DELETE FROM {table}"), &[]).await?;
        tracing::debug!(table, deleted, "Cleared table");
    }

    tracing::info!("Test data cleared");
    Ok(())
}

/// Fetch a customer by id. A missing customer is `Ok(None)`.
pub async fn get_customer(db: &Database, customer_id: i32) -> Result<Option<Customer>, AppError> {
    db.fetch_first_as(
        "SELECT customer_id, first_name, last_name, email, phone, address, created_at \
         FROM customers WHERE customer_id = ?",
        &[SqlValue::from(customer_id)],
    )
    .await
}

/// Fetch an account by id. A missing account is `Ok(None)`.
pub async fn get_account(db: &Database, account_id: i32) -> Result<Option<Account>, AppError> {
    db.fetch_first_as(
        "SELECT account_id, customer_id, account_type, balance, created_at \
         FROM accounts WHERE account_id = ?",
        &[SqlValue::from(account_id)],
    )
    .await
}

/// Set an account's balance.
///
/// Returns the number of matched rows: 0 when the account does not exist.
pub async fn update_balance(
    db: &Database,
    account_id: i32,
    new_balance: Decimal,
) -> Result<u64, AppError> {
    let updated = db
        .execute(
            "UPDATE accounts SET balance = ? WHERE account_id = ?",
            &[SqlValue::from(new_balance), SqlValue::from(account_id)],
        )
        .await?;

    tracing::debug!(account_id, %new_balance, "Updated balance");
    Ok(updated)
}

/// Append a transaction record; the server stamps `transaction_date`.
pub async fn log_transaction(
    db: &Database,
    account_id: i32,
    transaction_type: &str,
    amount: Decimal,
) -> Result<(), AppError> {
    db.execute(
        "INSERT INTO transactions (account_id, transaction_type, amount, transaction_date) \
         VALUES (?, ?, ?, NOW())",
        &[
            SqlValue::from(account_id),
            SqlValue::from(transaction_type),
            SqlValue::from(amount),
        ],
    )
    .await?;

    tracing::debug!(account_id, transaction_type, %amount, "Logged transaction");
    Ok(())
}

/// All transaction records of an account, oldest first.
pub async fn get_transactions(
    db: &Database,
    account_id: i32,
) -> Result<Vec<TransactionRecord>, AppError> {
    let rows = db
        .execute_query(
            "SELECT transaction_id, account_id, transaction_type, amount, transaction_date \
             FROM transactions WHERE account_id = ? ORDER BY transaction_id",
            &[SqlValue::from(account_id)],
        )
        .await?;

    let records = rows
        .iter()
        .map(TransactionRecord::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Restore the baseline accounts after a run.
///
/// # Process
///
/// In one transaction:
/// 1. Delete all transaction records
/// 2. Delete all accounts
/// 3. Reinsert `baseline_accounts()`
///
/// The baseline references customers 1-3, so those must exist or the whole
/// reset rolls back.
pub async fn reset_account_balances(db: &Database) -> Result<(), AppError> {
    tracing::info!("Resetting account balances...");

    let statements: Vec<Statement> = [
        Statement::new("DELETE FROM transactions"),
        Statement::new("DELETE FROM accounts"),
    ]
    .into_iter()
    .chain(baseline_accounts().iter().map(insert_account))
    .collect();

    db.execute_transaction(&statements).await?;
    tracing::info!("Account balances reset");
    Ok(())
}

/// Delete `test_results` rows older than `days` days.
pub async fn purge_stale_test_results(db: &Database, days: u32) -> Result<u64, AppError> {
    tracing::info!(days, "Clearing old test results...");

    let deleted = db
        .execute(
            "DELETE FROM test_results WHERE executed_at < DATE_SUB(NOW(), INTERVAL ? DAY)",
            &[SqlValue::from(days)],
        )
        .await?;

    tracing::info!(deleted, "Old test results cleared");
    Ok(deleted)
}

/// Store one test outcome in `test_results`.
pub async fn record_test_result(db: &Database, result: &NewTestResult) -> Result<(), AppError> {
    db.execute(
        "INSERT INTO test_results (test_name, status, execution_time, error_message) \
         VALUES (?, ?, ?, ?)",
        &[
            SqlValue::from(result.test_name.as_str()),
            SqlValue::from(result.status.as_str()),
            SqlValue::from(result.execution_time),
            SqlValue::from(result.error_message.clone()),
        ],
    )
    .await?;

    Ok(())
}
