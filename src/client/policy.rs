use crate::context::RequestContext;
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use super::core::ApiClient;

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Retry policy for one client.
///
/// Asymmetric on purpose: transport failures and HTTP 429 are transient,
/// every other rejection is final and retrying it would only burn quota.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub max_attempts: u32,
    pub default_retry_wait: Duration,
}

impl RetryPolicy {
    /// Decide what to do after `attempt` (1-based) failed with `err`.
    pub fn decide(&self, err: &Error, attempt: u32) -> Decision {
        let delay = match err {
            Error::Transport(t) if t.is_retryable() => Duration::ZERO,
            Error::Remote {
                status: 429,
                retry_after,
                ..
            } => retry_after.unwrap_or(self.default_retry_wait),
            _ => return Decision::Fail,
        };

        // Nothing follows the last attempt, so there is nothing to wait for.
        if attempt >= self.max_attempts {
            return Decision::Retry {
                delay: Duration::ZERO,
            };
        }
        Decision::Retry { delay }
    }
}

/// Bookkeeping for one logical call; dropped when the call returns.
#[derive(Debug)]
pub(crate) struct AttemptRecord {
    /// Attempts started so far.
    pub index: u32,
    pub last_error: Option<Error>,
    started: Instant,
}

impl AttemptRecord {
    pub fn start() -> Self {
        Self {
            index: 0,
            last_error: None,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn exhausted(self) -> Error {
        Error::RetriesExhausted {
            attempts: self.index,
            elapsed: self.elapsed(),
            last: self.last_error.map(Box::new),
        }
    }
}

impl ApiClient {
    /// Run `op` up to `max_attempts` times under the shared rate limiter.
    ///
    /// Each attempt first takes a rate limiter token; a cancelled or expired
    /// `ctx` aborts right there without counting an attempt. `op` receives the
    /// 1-based attempt number. Transport failures are retried at once unless the
    /// request could not even be built. 429s wait for the provider hint (or the
    /// configured default wait). Anything else is returned to the caller unchanged. When the budget runs out the result
    /// is [`Error::RetriesExhausted`] carrying the last underlying error.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        max_attempts: u32,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = RetryPolicy {
            max_attempts,
            ..self.policy.clone()
        };
        let mut record = AttemptRecord::start();

        while record.index < policy.max_attempts {
            self.admit(ctx).await?;
            record.index += 1;

            let err = match op(record.index).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match policy.decide(&err, record.index) {
                Decision::Fail => return Err(err),
                Decision::Retry { delay } => {
                    warn!(
                        attempt = record.index,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "wb api attempt failed, retrying"
                    );
                    record.last_error = Some(err);
                    if !delay.is_zero() {
                        ctx.sleep(delay)
                            .await
                            .map_err(|reason| Error::cancelled("throttle wait", reason))?;
                    }
                }
            }
        }

        Err(record.exhausted())
    }
}
