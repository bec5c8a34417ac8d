use super::{HttpTransport, TransportError, TransportRequest, TransportResponse};
use crate::Result;
use async_trait::async_trait;
use std::env;
use std::time::Duration;

/// Production transport on top of a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose client-level timeout is `timeout`.
    ///
    /// Pool sizing stays env-overridable:
    /// - `WB_HTTP_POOL_MAX_IDLE_PER_HOST` (default 32)
    /// - `WB_HTTP_POOL_IDLE_TIMEOUT_SECS` (default 90)
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("WB_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("WB_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )))
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::from(e)))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client (shared pools, proxies, custom TLS).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        // Read to the end so the connection goes back to the pool.
        let body = resp.bytes().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
