//! TestRail service for publishing test results.
//!
//! This module handles:
//! - Authenticated calls to the TestRail v2 API (HTTP basic auth)
//! - Run lifecycle: create, submit results, close
//! - The end-to-end upload of parsed report logs
//!
//! # Endpoints Used
//!
//! All paths live under `{TESTRAIL_URL}/index.php?/api/v2/`:
//! - `GET get_projects` - connection check
//! - `GET get_cases/{project_id}&suite_id={suite_id}`
//! - `GET get_statuses`
//! - `POST add_run/{project_id}`
//! - `POST add_result_for_case/{run_id}/{case_id}`
//! - `POST add_results/{run_id}`
//! - `POST close_run/{run_id}`

use std::path::Path;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::TestRailConfig,
    error::AppError,
    models::testrail::{
        AddResultsRequest, AddRunRequest, CaseResult, CasesResponse, ResultEntry, Run, Status,
        TestCase,
    },
    services::report_parser,
};

/// Client for one TestRail project and suite.
///
/// Holds no state between calls besides the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct TestRailClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    project_id: u32,
    suite_id: u32,
}

impl TestRailClient {
    /// Build a client from configuration.
    ///
    /// # Timeout
    ///
    /// 30 seconds per request.
    pub fn new(config: &TestRailConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/index.php?/api/v2", config.url.trim_end_matches('/')),
            user: config.user.clone(),
            password: config.password.clone(),
            project_id: config.project_id,
            suite_id: config.suite_id,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Authenticate, send, and turn non-2xx answers into `TestRailStatus`.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, AppError> {
        let response = request
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TestRailStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        self.send(self.http.get(self.endpoint(path))).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.send(self.http.post(self.endpoint(path)).json(body)).await
    }

    /// Check that the instance is reachable and the credentials work.
    pub async fn check_connection(&self) -> Result<(), AppError> {
        self.get::<serde_json::Value>("get_projects").await?;
        tracing::info!("TestRail connection verified");
        Ok(())
    }

    /// Like `check_connection`, but logs failures and reports `false`.
    pub async fn verify_connection(&self) -> bool {
        match self.check_connection().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("TestRail connection failed: {e}");
                false
            }
        }
    }

    /// All test cases of the configured suite.
    pub async fn get_cases(&self) -> Result<Vec<TestCase>, AppError> {
        let path = format!("get_cases/{}&suite_id={}", self.project_id, self.suite_id);
        let cases = self.get::<CasesResponse>(&path).await?.into_cases();
        tracing::info!("Fetched {} test cases from TestRail", cases.len());
        Ok(cases)
    }

    /// Result statuses defined on the instance, including custom ones.
    pub async fn get_statuses(&self) -> Result<Vec<Status>, AppError> {
        self.get("get_statuses").await
    }

    /// Create a run over the configured suite and return its id.
    pub async fn create_run(&self, name: &str, description: &str) -> Result<u64, AppError> {
        let request = AddRunRequest {
            name: name.to_string(),
            description: description.to_string(),
            suite_id: self.suite_id,
        };

        let run: Run = self
            .post(&format!("add_run/{}", self.project_id), &request)
            .await?;

        tracing::info!(run_id = run.id, "Created TestRail run");
        Ok(run.id)
    }

    /// Submit one result for one case of a run.
    pub async fn add_result_for_case(&self, run_id: u64, result: &CaseResult) -> Result<(), AppError> {
        let mut entry = ResultEntry::from(result);
        // The case is addressed by the URL
        entry.case_id = None;

        self.post::<_, serde_json::Value>(
            &format!("add_result_for_case/{run_id}/{}", result.case_id),
            &entry,
        )
        .await?;

        tracing::debug!(
            run_id,
            case_id = result.case_id,
            status = ?result.status,
            "Added result for test case"
        );
        Ok(())
    }

    /// Submit a batch of results to a run in one request.
    pub async fn add_results(&self, run_id: u64, results: &[CaseResult]) -> Result<(), AppError> {
        let request = AddResultsRequest {
            results: results.iter().map(ResultEntry::from).collect(),
        };

        self.post::<_, serde_json::Value>(&format!("add_results/{run_id}"), &request)
            .await?;

        tracing::info!(run_id, "Added {} test results to TestRail run", results.len());
        Ok(())
    }

    /// Close a run; closed runs are read-only.
    pub async fn close_run(&self, run_id: u64) -> Result<(), AppError> {
        self.post::<_, serde_json::Value>(&format!("close_run/{run_id}"), &serde_json::json!({}))
            .await?;

        tracing::info!(run_id, "Closed TestRail run");
        Ok(())
    }
}

/// Name given to runs created by `upload_results`.
pub fn run_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("Automated Test Run - {}", now.to_rfc3339())
}

/// Upload the results found in `reports_dir` as a new, closed run.
///
/// # Process
///
/// 1. Verify the connection (fails fast on bad credentials)
/// 2. Parse every `*.log` file in `reports_dir`
/// 3. Create a run, submit the batch, close the run
///
/// # Returns
///
/// The run id, or `None` when there was nothing to upload (no run is created).
///
/// # Errors
///
/// Any TestRail or I/O failure is returned; the caller decides the exit status.
pub async fn upload_results(
    client: &TestRailClient,
    reports_dir: &Path,
) -> Result<Option<u64>, AppError> {
    tracing::info!("Starting TestRail upload...");

    client.check_connection().await?;

    let results = report_parser::parse_reports_dir(reports_dir)?;
    if results.is_empty() {
        tracing::warn!("No test results found to upload");
        return Ok(None);
    }

    let run_id = client
        .create_run(&run_name(chrono::Utc::now()), "")
        .await?;
    client.add_results(run_id, &results).await?;
    client.close_run(run_id).await?;

    tracing::info!(run_id, uploaded = results.len(), "TestRail upload completed");
    Ok(Some(run_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(url: &str) -> TestRailConfig {
        TestRailConfig {
            url: url.to_string(),
            user: "qa@example.com".to_string(),
            password: "token".to_string(),
            project_id: 3,
            suite_id: 9,
        }
    }

    #[test]
    fn base_url_uses_the_v2_api_path() {
        let client = TestRailClient::new(&config("https://bank.testrail.io/")).unwrap();
        assert_eq!(
            client.endpoint("add_run/3"),
            "https://bank.testrail.io/index.php?/api/v2/add_run/3"
        );
    }

    #[test]
    fn run_name_carries_the_timestamp() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        assert_eq!(
            run_name(now),
            "Automated Test Run - 2024-01-15T09:30:00+00:00"
        );
    }
}
