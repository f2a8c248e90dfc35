//! Test report parsing.
//!
//! Turns Mocha-style reporter log files into `CaseResult`s for upload.
//!
//! # Line Format
//!
//! ```text
//!     ✓ C101 should login as Harry Potter
//!     ✖ C204 should reject a withdrawal above the balance
//!   2 passing (14.2s)
//! ```
//!
//! A line with `✓`/`✔` is a pass and a line with `✗`/`✖` is a failure.
//! Summary lines (`N passing`) carry no marker and are not results.
//!
//! The case id comes from the `C<number>` token the test title carries.
//! A marked line without one gets the next scan-order position in its file
//! as a case id, moved past any id the file already uses. That numbering
//! only matches TestRail if the log order happens to equal the suite order,
//! so each fallback is logged as a warning.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::AppError,
    models::testrail::{CaseResult, TestStatus},
};

const PASS_MARKERS: [char; 2] = ['✓', '✔'];
const FAIL_MARKERS: [char; 2] = ['✗', '✖'];

static CASE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bC(\d+)\b").expect("case id pattern is valid"));

/// Extract an explicit `C<number>` case id from a line.
pub fn explicit_case_id(line: &str) -> Option<u32> {
    CASE_ID
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn line_status(line: &str) -> Option<TestStatus> {
    if line.contains(PASS_MARKERS) {
        Some(TestStatus::Passed)
    } else if line.contains(FAIL_MARKERS) {
        Some(TestStatus::Failed)
    } else {
        None
    }
}

/// Parse one log file's content.
///
/// Fallback ids never reuse an id that a line of the same file declares
/// explicitly, or one already handed out.
pub fn parse_log(content: &str) -> Vec<CaseResult> {
    let mut taken: HashSet<u32> = content
        .lines()
        .filter(|line| line_status(line).is_some())
        .filter_map(explicit_case_id)
        .collect();
    let mut results = Vec::new();

    for line in content.lines() {
        let Some(status) = line_status(line) else {
            continue;
        };

        let case_id = match explicit_case_id(line) {
            Some(id) => id,
            None => {
                let mut position = u32::try_from(results.len() + 1).unwrap_or(u32::MAX);
                while taken.contains(&position) && position < u32::MAX {
                    position = position.saturating_add(1);
                }
                taken.insert(position);
                tracing::warn!(
                    case_id = position,
                    line = line.trim(),
                    "No case id in test title, using scan order"
                );
                position
            }
        };

        let comment = match status {
            TestStatus::Passed => "Test passed".to_string(),
            _ => line.trim().to_string(),
        };

        results.push(CaseResult::new(case_id, status).with_comment(comment));
    }

    results
}

/// Parse every `*.log` file in `dir`, in file-name order.
///
/// A missing directory yields no results rather than an error.
pub fn parse_reports_dir(dir: &Path) -> Result<Vec<CaseResult>, AppError> {
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "Reports directory not found");
        return Ok(Vec::new());
    }

    let mut logs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
            logs.push(path);
        }
    }
    logs.sort();

    let mut results = Vec::new();
    for path in logs {
        let content = std::fs::read_to_string(&path)?;
        let parsed = parse_log(&content);
        tracing::debug!(file = %path.display(), results = parsed.len(), "Parsed report");
        results.extend(parsed);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT_LOG: &str = "\
Banking - Deposits
    ✓ C101 should deposit 500 into Savings
    ✖ C102 should reject an empty amount
    ✔ C103 should show the new balance

  2 passing (12.4s)
  1 failing
";

    #[test]
    fn explicit_case_ids_are_used() {
        let results = parse_log(REPORT_LOG);
        let ids: Vec<u32> = results.iter().map(|r| r.case_id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
    }

    #[test]
    fn summary_lines_are_not_results() {
        assert_eq!(parse_log(REPORT_LOG).len(), 3);
        assert!(parse_log("  5 passing (3s)\n  1 failing\n").is_empty());
    }

    #[test]
    fn failures_keep_the_line_as_comment() {
        let results = parse_log(REPORT_LOG);
        assert_eq!(results[0].status, TestStatus::Passed);
        assert_eq!(results[0].comment.as_deref(), Some("Test passed"));
        assert_eq!(results[1].status, TestStatus::Failed);
        assert_eq!(
            results[1].comment.as_deref(),
            Some("✖ C102 should reject an empty amount")
        );
    }

    #[test]
    fn titles_without_ids_fall_back_to_scan_order() {
        let results = parse_log("✓ logs in\n✗ withdraws too much\n✓ C42 logs out\n✓ deposits\n");
        let ids: Vec<u32> = results.iter().map(|r| r.case_id).collect();
        assert_eq!(ids, vec![1, 2, 42, 4]);
    }

    #[test]
    fn fallback_ids_skip_ids_declared_in_the_file() {
        let results = parse_log("✓ C2 logs in\n✖ withdraws too much\n");
        let ids: Vec<(u32, TestStatus)> = results.iter().map(|r| (r.case_id, r.status)).collect();
        assert_eq!(ids, vec![(2, TestStatus::Passed), (3, TestStatus::Failed)]);

        // A later explicit id is reserved too
        let results = parse_log("✗ withdraws too much\n✓ C1 logs in\n✓ deposits\n");
        let ids: Vec<u32> = results.iter().map(|r| r.case_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn case_id_needs_a_word_boundary() {
        assert_eq!(explicit_case_id("✓ [C12] login"), Some(12));
        assert_eq!(explicit_case_id("✓ ABC12 login"), None);
        assert_eq!(explicit_case_id("✓ C12abc login"), None);
    }

    #[test]
    fn reports_dir_reads_only_log_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.log"), "✓ C2 second\n").unwrap();
        std::fs::write(dir.path().join("a.log"), "✓ C1 first\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "✓ C3 ignored\n").unwrap();

        let results = parse_reports_dir(dir.path()).unwrap();
        let ids: Vec<u32> = results.iter().map(|r| r.case_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn missing_reports_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let results = parse_reports_dir(&dir.path().join("reports")).unwrap();
        assert!(results.is_empty());
    }
}
