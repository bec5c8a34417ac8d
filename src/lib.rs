//! # wb-api-client
//!
//! Shared, concurrency-safe client for the Wildberries seller API.
//!
//! ## Overview
//!
//! One [`ApiClient`] serves every caller that talks to the same seller
//! account. It owns the account-wide request quota, so concurrent callers
//! cannot collectively exceed it, and it turns every failure into a typed
//! [`Error`] that maps onto a small set of diagnostic categories.
//!
//! ## Key Features
//!
//! - **Account-wide quota**: a token-bucket limiter admits every attempt,
//!   retries included, via [`resilience::RateLimiter`]
//! - **Bounded retries**: transport failures and 429 responses are retried up to
//!   a fixed attempt budget; 429s honor the provider's retry hint
//! - **Cancellation**: every call takes a [`RequestContext`] whose cancellation
//!   or deadline stops limiter waits, throttle sleeps and in-flight exchanges
//! - **Diagnosis**: [`error_code::classify`] maps any failure to one of
//!   `authentication_failed`, `timeout`, `network_error`, `rate_limit`, `unknown`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use wb_api_client::{ApiClient, ClientConfig, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> wb_api_client::Result<()> {
//!     let client = ApiClient::new(ClientConfig::new("your-api-key"))?;
//!
//!     let ctx = RequestContext::new().with_timeout(Duration::from_secs(10));
//!     let pong = client.ping(&ctx).await?;
//!     println!("remote time: {}", pong.ts);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client facade, builder, executor and retry loop |
//! | [`config`] | Configuration defaults, env and YAML loading, validation |
//! | [`context`] | Per-call cancellation and deadline |
//! | [`error_code`] | Diagnostic categories and classification |
//! | [`resilience`] | Token-bucket rate limiting |
//! | [`transport`] | Injectable HTTP transport and the reqwest implementation |
//! | [`types`] | Response envelopes |

pub mod client;
pub mod config;
pub mod context;
pub mod error_code;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{ApiClient, ApiClientBuilder};
pub use config::ClientConfig;
pub use context::{CancelReason, RequestContext};
pub use error_code::{classify, Diagnosis, ErrorCategory};
pub use transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};
pub use types::{ApiResponse, PingResponse};
pub use reqwest::Method;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
