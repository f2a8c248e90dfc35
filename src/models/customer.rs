//! Customer data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a customer record from the database.
///
/// # Database Table
///
/// Maps to the `customers` table. Deleting a customer cascades to its
/// accounts (enforced by the schema's foreign keys, not by this crate).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Customer {
    /// Primary key
    pub customer_id: i32,

    pub first_name: String,

    pub last_name: String,

    /// Unique across customers when present
    pub email: Option<String>,

    pub phone: Option<String>,

    pub address: Option<String>,

    /// Set by the server on insert
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// "First Last", as the demo site shows it in the customer picker.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A customer row to insert with a fixed primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub customer_id: i32,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
}
