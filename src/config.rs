//! Configuration management.
//!
//! Database and TestRail settings are loaded from environment variables with
//! the `envy` crate, after an optional `.env` file has been read by `dotenvy`.
//! Each settings group has its own prefix (`DB_`, `TESTRAIL_`) so the structs
//! stay small and independently loadable.
//!
//! This module also hosts the environment check run before a test session
//! (`validate_environment`), which reports every missing or malformed variable
//! at once instead of failing on the first.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;

use crate::error::AppError;

/// MySQL connection settings.
///
/// # Environment Variables
///
/// - `DB_HOST` (optional): defaults to `localhost`
/// - `DB_PORT` (optional): defaults to 3306
/// - `DB_USER` (optional): defaults to `root`
/// - `DB_PASSWORD` (optional): defaults to empty
/// - `DB_NAME` (optional): defaults to `banking_app_test`
/// - `DB_MAX_CONNECTIONS` (optional): pool capacity, defaults to 10
/// - `DB_ACQUIRE_TIMEOUT_SECS` (optional): how long a caller waits for a free connection, defaults to 30
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_database")]
    pub name: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_user() -> String {
    "root".to_string()
}

fn default_database() -> String {
    "banking_app_test".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: String::new(),
            name: default_database(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl DbConfig {
    /// Load database settings from `DB_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed
    /// (e.g. `DB_PORT=abc`).
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("DB_").from_env::<DbConfig>()
    }

    /// Connection options targeting the configured database.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        self.server_options().database(&self.name)
    }

    /// Connection options for the server only, with no default database.
    ///
    /// Used to create the database before anything can connect to it.
    pub fn server_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// TestRail API settings.
///
/// # Environment Variables
///
/// - `TESTRAIL_URL` (optional): instance base URL, defaults to `https://testrail.com`
/// - `TESTRAIL_USER` / `TESTRAIL_PASSWORD` (optional): basic-auth credentials
/// - `TESTRAIL_PROJECT_ID` / `TESTRAIL_SUITE_ID` (optional): default to 0
#[derive(Debug, Clone, Deserialize)]
pub struct TestRailConfig {
    #[serde(default = "default_testrail_url")]
    pub url: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub project_id: u32,

    #[serde(default)]
    pub suite_id: u32,
}

fn default_testrail_url() -> String {
    "https://testrail.com".to_string()
}

impl TestRailConfig {
    /// Load TestRail settings from `TESTRAIL_*` environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("TESTRAIL_").from_env::<TestRailConfig>()
    }
}

/// Variables a test session cannot run without, grouped by concern.
pub const REQUIRED_VARS: &[(&str, &[&str])] = &[
    ("database", &["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_NAME"]),
    ("testrail", &["TESTRAIL_URL", "TESTRAIL_USER", "TESTRAIL_PASSWORD"]),
    ("application", &["APP_URL"]),
];

/// Variables that fall back to defaults when unset.
pub const OPTIONAL_VARS: &[&str] = &["TEST_ENV", "LOG_LEVEL", "BROWSER_NAME", "HEADLESS"];

/// Outcome of checking the environment.
#[derive(Debug, Default)]
pub struct EnvReport {
    /// Missing required variables as `(section, name)`.
    pub missing: Vec<(&'static str, &'static str)>,

    /// Required variables that are present.
    pub configured: Vec<&'static str>,

    /// Optional variables that are not set.
    pub optional_unset: Vec<&'static str>,

    /// Variables that are set but hold an unusable value.
    pub invalid: Vec<String>,
}

impl EnvReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    /// Flatten the report into one message per problem.
    pub fn problems(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|(section, name)| format!("{name} is not set ({section})"))
            .chain(self.invalid.iter().cloned())
            .collect()
    }

    /// Convert a failing report into `AppError::InvalidEnvironment`.
    pub fn into_result(self) -> Result<Self, AppError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(AppError::InvalidEnvironment(self.problems()))
        }
    }
}

/// Check variables through `lookup`, which returns `None` for unset or empty.
///
/// Taking a lookup function instead of reading the process environment keeps
/// this testable without mutating global state.
pub fn check_environment<F>(lookup: F) -> EnvReport
where
    F: Fn(&str) -> Option<String>,
{
    let mut report = EnvReport::default();

    for &(section, vars) in REQUIRED_VARS {
        for &name in vars {
            if lookup(name).is_some() {
                report.configured.push(name);
            } else {
                report.missing.push((section, name));
            }
        }
    }

    report.optional_unset = OPTIONAL_VARS
        .iter()
        .copied()
        .filter(|name| lookup(name).is_none())
        .collect();

    for name in ["TESTRAIL_URL", "APP_URL"] {
        if let Some(value) = lookup(name) {
            if url::Url::parse(&value).is_err() {
                report.invalid.push(format!("{name} is not a valid URL"));
            }
        }
    }

    if let Some(port) = lookup("DB_PORT") {
        match port.parse::<u16>() {
            Ok(p) if p >= 1 => {}
            _ => report
                .invalid
                .push("DB_PORT is not a valid port number (1-65535)".to_string()),
        }
    }

    report
}

/// Make sure `dir/.env` exists, creating it from `dir/.env.example` if needed.
///
/// Returns `true` if the file had to be created.
///
/// # Errors
///
/// `InvalidEnvironment` if neither file exists, `Io` if the copy fails.
pub fn ensure_env_file(dir: &Path) -> Result<bool, AppError> {
    let env_path = dir.join(".env");
    if env_path.exists() {
        return Ok(false);
    }

    let example_path = dir.join(".env.example");
    if !example_path.exists() {
        return Err(AppError::InvalidEnvironment(vec![
            ".env file not found and no .env.example to create it from".to_string(),
        ]));
    }

    std::fs::copy(&example_path, &env_path)?;
    tracing::warn!(
        "Created {} from .env.example, update it with real values",
        env_path.display()
    );
    Ok(true)
}

/// Load `dir/.env` and check the process environment.
pub fn validate_environment(dir: &Path) -> Result<EnvReport, AppError> {
    ensure_env_file(dir)?;
    dotenvy::from_path(dir.join(".env")).ok();

    Ok(check_environment(|name| {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }))
}
