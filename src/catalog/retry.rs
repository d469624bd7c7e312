//! catalog::retry
//!
//! Exponential backoff for remote listing calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::identity::IdentityError;

/// Retry behavior for a remote operation.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Backoff before retry number `attempt + 1`.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let backoff_ms = backoff.min(self.max_backoff.as_millis() as f64) as u64;
        Duration::from_millis(backoff_ms)
    }
}

/// Run `f` until it succeeds, fails permanently, or exhausts the retries.
pub async fn retry_remote<F, Fut, T>(
    config: &RetryConfig,
    operation: &str,
    f: F,
) -> Result<T, IdentityError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, IdentityError>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(operation, attempt = attempt + 1, "succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                if error.is_permanent() {
                    warn!(operation, %error, "permanent failure, not retrying");
                    return Err(error);
                }
                if attempt >= config.max_retries {
                    warn!(operation, attempt = attempt + 1, %error, "failed after max retries");
                    return Err(error);
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    %error,
                    backoff_ms = backoff.as_millis() as u64,
                    "failed, retrying after backoff"
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
