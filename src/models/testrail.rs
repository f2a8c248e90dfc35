//! TestRail API request/response types.
//!
//! This module defines:
//! - `TestStatus`: the local four-valued outcome and its TestRail status id
//! - `CaseResult`: one test outcome ready to upload
//! - Request bodies for `add_run` and `add_results`
//! - Response bodies for runs, cases and statuses

use serde::{Deserialize, Serialize};

/// Outcome of one test case.
///
/// # Status Id Mapping
///
/// TestRail identifies statuses by number:
/// - `Passed` → 1
/// - `Blocked` → 3
/// - `Failed` → 5
/// - `Skipped` → 6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Blocked,
    Skipped,
}

impl TestStatus {
    pub fn status_id(self) -> u8 {
        match self {
            TestStatus::Passed => 1,
            TestStatus::Blocked => 3,
            TestStatus::Failed => 5,
            TestStatus::Skipped => 6,
        }
    }

    /// Parse a status name, ignoring case and surrounding whitespace.
    pub fn parse(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "passed" => Some(TestStatus::Passed),
            "failed" => Some(TestStatus::Failed),
            "blocked" => Some(TestStatus::Blocked),
            "skipped" => Some(TestStatus::Skipped),
            _ => None,
        }
    }
}

/// Map a status name to its TestRail id.
///
/// Unrecognized names map to 1 (passed).
pub fn status_id_for(status: &str) -> u8 {
    match TestStatus::parse(status) {
        Some(parsed) => parsed.status_id(),
        None => {
            tracing::warn!(status, "Unknown test status, reporting as passed");
            TestStatus::Passed.status_id()
        }
    }
}

/// One test outcome to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    /// TestRail case id (the number after `C` in the TestRail UI)
    pub case_id: u32,

    pub status: TestStatus,

    pub comment: Option<String>,

    /// Test duration in milliseconds
    pub elapsed_ms: Option<u64>,

    /// Appended to the comment when present
    pub error_message: Option<String>,
}

impl CaseResult {
    pub fn new(case_id: u32, status: TestStatus) -> Self {
        Self {
            case_id,
            status,
            comment: None,
            elapsed_ms: None,
            error_message: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Format a duration as a TestRail timespan.
///
/// TestRail timespans have one-second resolution and reject zero, so any
/// non-zero duration is rounded up to whole seconds.
pub fn format_elapsed(elapsed_ms: u64) -> Option<String> {
    if elapsed_ms == 0 {
        return None;
    }
    Some(format!("{}s", elapsed_ms.div_ceil(1000)))
}

/// Result body for `add_result_for_case` and entries of `add_results`.
///
/// # JSON Example
///
/// ```json
/// {
///   "case_id": 101,
///   "status_id": 5,
///   "comment": "Deposit failed\n\nError: expected 'Deposit Successful'",
///   "elapsed": "3s"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    /// Omitted when the case is addressed by URL (`add_result_for_case`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<u32>,

    pub status_id: u8,

    pub comment: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
}

impl From<&CaseResult> for ResultEntry {
    fn from(result: &CaseResult) -> Self {
        let mut comment = result.comment.clone().unwrap_or_default();
        if let Some(error) = &result.error_message {
            comment.push_str(&format!("\n\nError: {error}"));
        }

        Self {
            case_id: Some(result.case_id),
            status_id: result.status.status_id(),
            comment,
            elapsed: result.elapsed_ms.and_then(format_elapsed),
        }
    }
}

/// Body of `POST add_results/{run_id}`.
#[derive(Debug, Serialize)]
pub struct AddResultsRequest {
    pub results: Vec<ResultEntry>,
}

/// Body of `POST add_run/{project_id}`.
#[derive(Debug, Serialize)]
pub struct AddRunRequest {
    pub name: String,
    pub description: String,
    pub suite_id: u32,
}

/// A test run as returned by `add_run` and `close_run`.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

/// A test case from `get_cases`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub suite_id: Option<u32>,
}

/// `get_cases` returns a bare array on older TestRail versions and a
/// paginated object on 6.7+.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CasesResponse {
    Paginated { cases: Vec<TestCase> },
    Bare(Vec<TestCase>),
}

impl CasesResponse {
    pub fn into_cases(self) -> Vec<TestCase> {
        match self {
            CasesResponse::Paginated { cases } => cases,
            CasesResponse::Bare(cases) => cases,
        }
    }
}

/// A result status from `get_statuses`.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: u32,
    pub name: String,
    pub label: String,
}
