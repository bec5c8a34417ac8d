use crate::context::{CancelReason, RequestContext};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Float slack when comparing token counts after a computed sleep.
const TOKEN_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub rps: f64,
    pub burst: f64,
    pub tokens: f64,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Tokens per second.
    pub rps: f64,
    /// Maximum burst size (tokens).
    pub burst: f64,
}

impl RateLimiterConfig {
    pub fn from_rps(rps: f64) -> Option<Self> {
        if !rps.is_finite() || rps < 0.0 {
            return None;
        }
        Some(Self {
            rps,
            burst: rps.max(1.0), // default burst: 1 second worth, at least 1
        })
    }

    /// Requests per minute with an explicit burst, the shape the remote quota is documented in.
    pub fn per_minute(requests_per_minute: u32, burst: u32) -> Self {
        Self {
            rps: f64::from(requests_per_minute) / 60.0,
            burst: f64::from(burst.max(1)),
        }
    }

    /// Create a new config with default values
    pub fn new() -> Self {
        Self { rps: 10.0, burst: 10.0 }
    }

    /// Set the maximum tokens (burst size)
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.burst = tokens as f64;
        self
    }

    /// Set the refill rate (tokens per second)
    pub fn with_refill_rate(mut self, rate: f64) -> Self {
        self.rps = rate;
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last: Instant,
}

/// Token-bucket admission gate shared by every caller of one client.
///
/// - Tokens refill continuously at `rps`, computed lazily on each access
/// - The bucket never holds more than `burst` tokens
/// - Waiters queue on a fair async mutex, so admission is FIFO
/// - A cancelled or expired waiter leaves without taking a token
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
    /// Held by the waiter at the head of the queue while it sleeps for a token.
    queue: tokio::sync::Mutex<()>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        let burst = cfg.burst;
        let state = Mutex::new(State {
            tokens: burst,
            last: Instant::now(),
        });
        Self {
            cfg,
            state,
            queue: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        // Critical sections only do arithmetic, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refill_locked(cfg: &RateLimiterConfig, st: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(st.last).as_secs_f64();
        if elapsed > 0.0 {
            st.tokens = (st.tokens + elapsed * cfg.rps).min(cfg.burst);
            st.last = now;
        }
    }

    /// Take a token if one is available right now, otherwise report how long until one is.
    fn take_or_wait(&self) -> Option<Duration> {
        let cfg = &self.cfg;
        let mut st = self.lock_state();
        Self::refill_locked(cfg, &mut st);

        if st.tokens + TOKEN_EPSILON >= 1.0 {
            st.tokens = (st.tokens - 1.0).max(0.0);
            return None;
        }

        let missing = 1.0 - st.tokens;
        let nanos = (missing / cfg.rps * 1e9).ceil().max(1.0);
        Some(Duration::from_nanos(nanos as u64))
    }

    /// Acquire one token, waiting in line if the bucket is empty.
    ///
    /// Returns promptly with the reason when `ctx` is cancelled or its deadline
    /// passes; no token is consumed in that case. If the next token cannot
    /// arrive before the deadline the call fails immediately.
    pub async fn acquire(&self, ctx: &RequestContext) -> Result<(), CancelReason> {
        ctx.check()?;
        if self.cfg.rps <= 0.0 {
            return Ok(());
        }

        let _turn = tokio::select! {
            biased;
            reason = ctx.done() => return Err(reason),
            turn = self.queue.lock() => turn,
        };

        loop {
            let wait = match self.take_or_wait() {
                None => return Ok(()),
                Some(wait) => wait,
            };

            if let Some(remaining) = ctx.remaining() {
                if remaining < wait {
                    return Err(CancelReason::DeadlineExceeded);
                }
            }

            tokio::select! {
                biased;
                reason = ctx.done() => return Err(reason),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Try to acquire a token without waiting, returns true if successful.
    ///
    /// Never overtakes a caller already queued in [`RateLimiter::acquire`].
    pub fn try_acquire(&self) -> bool {
        if self.cfg.rps <= 0.0 {
            return true;
        }
        let Ok(_turn) = self.queue.try_lock() else {
            return false;
        };
        self.take_or_wait().is_none()
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let cfg = &self.cfg;
        let mut st = self.lock_state();

        let mut wait_ms = None;
        if cfg.rps > 0.0 {
            Self::refill_locked(cfg, &mut st);
            if st.tokens < 1.0 {
                let missing = 1.0 - st.tokens;
                wait_ms = Some((missing / cfg.rps * 1000.0).ceil() as u64);
            }
        }

        RateLimiterSnapshot {
            rps: cfg.rps,
            burst: cfg.burst,
            tokens: st.tokens,
            estimated_wait_ms: wait_ms,
        }
    }
}
