//! Account data model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table. Each account belongs to exactly one
/// customer via `customer_id`.
///
/// # Balance Storage
///
/// `balance` is a `DECIMAL(15,2)` column decoded as `rust_decimal::Decimal`,
/// so amounts round-trip exactly. Non-negative by convention only; nothing
/// in this crate or the schema rejects a negative balance.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Primary key
    pub account_id: i32,

    /// Owning customer
    pub customer_id: i32,

    /// e.g. "Savings", "Checking". Nullable in the schema.
    pub account_type: Option<String>,

    pub balance: Decimal,

    pub created_at: DateTime<Utc>,
}

/// An account row to insert.
///
/// `account_id` is `None` when the server should assign it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub account_id: Option<i32>,
    pub customer_id: i32,
    pub account_type: &'static str,
    pub balance: Decimal,
}
