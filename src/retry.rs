use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::{RETRY_ATTEMPTS, RETRY_DELAY_MS};
use crate::error::{AppError, Result};

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Single attempt, no waiting.
    #[cfg(test)]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RETRY_ATTEMPTS, Duration::from_millis(RETRY_DELAY_MS))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` attempts have failed,
/// then return the last error. A `max_attempts` of 0 still makes one attempt.
/// `Decode` errors are deterministic and returned without retrying.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e @ AppError::Decode(_)) => {
                warn!("{label}: {e} (not retried)");
                return Err(e);
            }
            Err(e) if attempt < attempts => {
                warn!("Retry [{attempt}/{attempts}] {label}: {e}");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("Retry [{attempt}/{attempts}] {label}: {e} (giving up)");
                return Err(e);
            }
        }
    }
}
