//! Test outcome records stored alongside the fixtures.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a row of the `test_results` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct TestResultRecord {
    pub test_id: i32,

    pub test_name: String,

    /// "passed", "failed", "blocked" or "skipped"
    pub status: String,

    /// Duration in milliseconds
    pub execution_time: Option<i32>,

    pub error_message: Option<String>,

    pub executed_at: DateTime<Utc>,
}

/// A test outcome to insert. `executed_at` is set by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTestResult {
    pub test_name: String,
    pub status: String,
    pub execution_time: Option<i32>,
    pub error_message: Option<String>,
}
