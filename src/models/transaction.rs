//! Account transaction data model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Represents a row of the `transactions` table.
///
/// Named `TransactionRecord` to keep it apart from database transactions.
/// Each record belongs to exactly one account; deleting the account cascades.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct TransactionRecord {
    pub transaction_id: i32,

    pub account_id: i32,

    /// "Credit" or "Debit" as the demo site labels them
    pub transaction_type: Option<String>,

    pub amount: Option<Decimal>,

    /// Assigned by the server (`NOW()`) on insert
    pub transaction_date: DateTime<Utc>,
}
