/*!
 * Bounded-retry execution of single provider calls.
 *
 * Only timeouts are retried. Anything else is returned on the spot; the
 * executor never looks at response bodies.
 */

use log::{debug, error};
use std::future::Future;
use std::time::Duration;

use crate::app_config::RequestConfig;
use crate::errors::{ExecutorError, TransportError};

/// Default number of attempts before `TimeoutExceeded`
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default per-attempt timeout
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs an idempotent operation with a per-attempt timeout
#[derive(Debug, Clone, PartialEq)]
pub struct RequestExecutor {
    max_attempts: u32,
    attempt_timeout: Duration,
    /// Pause between timed-out attempts
    backoff: Duration,
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_ATTEMPT_TIMEOUT)
    }
}

impl From<&RequestConfig> for RequestExecutor {
    fn from(config: &RequestConfig) -> Self {
        Self::new(config.max_attempts, config.timeout())
    }
}

impl RequestExecutor {
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
            backoff: Duration::ZERO,
        }
    }

    /// Wait `backoff` between timed-out attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Execute `operation`, retrying it only when an attempt times out.
    ///
    /// Each attempt is bounded by the attempt timeout regardless of whether
    /// the operation enforces one itself.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, ExecutorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(TransportError::Timeout)) | Err(_) => {
                    debug!("Attempt {}/{} timed out", attempt, self.max_attempts);
                }
                Ok(Err(other)) => return Err(ExecutorError::Transport(other)),
            }

            if attempt < self.max_attempts && !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff).await;
            }
        }

        error!("Timeout exception after {} attempts", self.max_attempts);
        Err(ExecutorError::TimeoutExceeded {
            attempts: self.max_attempts,
        })
    }
}
