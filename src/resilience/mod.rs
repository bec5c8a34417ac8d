//! Admission control for the shared remote quota.
//!
//! The remote account allows a fixed number of requests per minute plus a
//! small burst. Every caller of one [`crate::ApiClient`] shares one
//! [`rate_limiter::RateLimiter`], which is the only mutable state the client
//! shares between concurrent calls.
//!
//! ```rust
//! use wb_api_client::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//!
//! let limiter = RateLimiter::new(RateLimiterConfig::per_minute(100, 5));
//!
//! // Try to acquire a permit without waiting
//! if limiter.try_acquire() {
//!     // Proceed with request...
//! }
//! ```

pub mod rate_limiter;

pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterSnapshot};
