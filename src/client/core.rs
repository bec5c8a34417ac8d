use crate::config::ClientConfig;
use crate::context::RequestContext;
use crate::resilience::rate_limiter::{RateLimiter, RateLimiterSnapshot};
use crate::transport::HttpTransport;
use crate::types::PingResponse;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;
use url::Url;
use uuid::Uuid;

use super::execution::PreparedRequest;
use super::policy::RetryPolicy;
use super::preflight;

/// Path of the parameter-less health check.
pub const PING_PATH: &str = "/ping";

/// Shared client for one remote account.
///
/// Cheap to clone; clones share the transport and, above all, the rate
/// limiter, so the account-wide quota holds however many callers are active.
/// Everything except the limiter is read-only after construction.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) base_url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) policy: RetryPolicy,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("rate_limit", &self.config.rate_limit)
            .field("burst_limit", &self.config.burst_limit)
            .field("retry_attempts", &self.config.retry_attempts)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client with the production transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        crate::client::builder::ApiClientBuilder::from_config(config).build()
    }

    /// Build a client from `WB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn builder() -> crate::client::builder::ApiClientBuilder {
        crate::client::builder::ApiClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Current token-bucket state, for diagnostics.
    pub fn rate_limit_snapshot(&self) -> RateLimiterSnapshot {
        self.rate_limiter.snapshot()
    }

    /// GET `path` with `query` encoded as a URL query string, decoding the body into `T`.
    ///
    /// `T` may be an [`crate::types::ApiResponse`] envelope or a bare type,
    /// whatever the endpoint returns. Use `Option<_>` for endpoints that answer
    /// 204 with no body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.execute(ctx, Method::GET, path, query, None).await
    }

    /// POST `body` as JSON to `path`, decoding the response body into `T`.
    ///
    /// Retried like GET on transport failures and 429, so only use it for
    /// endpoints that are safe to re-issue.
    pub async fn post<B, T>(&self, ctx: &RequestContext, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| {
            Error::invalid_request_with_context(
                format!("marshal body: {}", e),
                ErrorContext::new()
                    .with_field_path("request.body")
                    .with_source("request_builder"),
            )
        })?;
        self.execute(ctx, Method::POST, path, &[], Some(Bytes::from(payload)))
            .await
    }

    /// Any method with an already encoded body; `get` and `post` are thin wrappers.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Bytes>,
    ) -> Result<T> {
        let url = preflight::resolve_url(&self.base_url, path, query)?;
        self.call(
            ctx,
            PreparedRequest {
                method,
                url,
                path: path.to_string(),
                body,
            },
        )
        .await
    }

    /// Health check against [`PING_PATH`].
    ///
    /// Goes through the same limiter and retry policy as every other call. A
    /// 2xx answer whose `Status` is not `"OK"` is a failure.
    pub async fn ping(&self, ctx: &RequestContext) -> Result<PingResponse> {
        let resp: PingResponse = self.get(ctx, PING_PATH, &[]).await?;
        if !resp.is_ok() {
            return Err(Error::PingStatus {
                status: resp.status,
            });
        }
        Ok(resp)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: PreparedRequest,
    ) -> Result<T> {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let prepared = &request;
        let id = request_id.as_str();
        let result = self
            .execute_with_retry(ctx, self.policy.max_attempts, move |attempt| {
                self.execute_once(ctx, prepared, id, attempt)
            })
            .await;

        if let Err(err) = &result {
            info!(
                request_id = request_id.as_str(),
                method = %request.method,
                path = request.path.as_str(),
                http_status = err.status(),
                error_class = err.category().tag(),
                duration_ms = start.elapsed().as_millis() as u64,
                "wb api request failed"
            );
        }
        result
    }
}
