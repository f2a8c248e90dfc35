//! Retry with exponential backoff.
//!
//! Nothing in `db` or the services retries on its own. Callers that want
//! retries wrap the call explicitly:
//!
//! ```no_run
//! # async fn example(db: &banking_testkit::db::Database) -> Result<(), banking_testkit::error::AppError> {
//! use std::time::Duration;
//! use banking_testkit::{retry::retry_with_backoff, services::fixture_service};
//!
//! retry_with_backoff(3, Duration::from_secs(1), || fixture_service::seed_test_data(db)).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Run `op` up to `max_attempts` times, sleeping between failures.
///
/// Returns the first success, or the error of the last attempt.
/// `max_attempts` of 0 is treated as 1.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = backoff_delay(base_delay, attempt);
                tracing::warn!(attempt, ?delay, "Attempt failed, retrying: {e}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
