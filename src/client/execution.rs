//! Request execution logic (single attempt).

use crate::context::RequestContext;
use crate::transport::TransportRequest;
use crate::{Error, Result};
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use super::core::ApiClient;
use super::preflight;

/// A request resolved once per logical call and replayed on every attempt.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    /// Path as given by the caller, for logs.
    pub path: String,
    pub body: Option<Bytes>,
}

impl ApiClient {
    /// Perform exactly one HTTP exchange and decode a 2xx body into `T`.
    ///
    /// No retry and no rate limiting happen here. A non-2xx status becomes
    /// [`Error::Remote`] with the raw body; a 429 also carries the provider's
    /// retry hint when one was sent.
    pub(crate) async fn execute_once<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: &PreparedRequest,
        request_id: &str,
        attempt: u32,
    ) -> Result<T> {
        let timeout = match ctx.remaining() {
            Some(remaining) => remaining.min(self.config.timeout),
            None => self.config.timeout,
        };

        let transport_request = TransportRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: self.headers.clone(),
            body: request.body.clone(),
            timeout: Some(timeout),
        };

        debug!(
            request_id,
            attempt,
            method = %request.method,
            path = request.path.as_str(),
            "sending wb api request"
        );

        let start = Instant::now();
        let resp = ctx
            .run(self.transport.send(transport_request))
            .await
            .map_err(|reason| Error::cancelled("http exchange", reason))??;

        debug!(
            request_id,
            attempt,
            http_status = resp.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "wb api response received"
        );

        if !resp.is_success() {
            let retry_after = if resp.status == 429 {
                preflight::retry_after(&resp.headers, &self.config.retry_hint_headers)
            } else {
                None
            };
            return Err(Error::Remote {
                status: resp.status,
                body: resp.text(),
                retry_after,
            });
        }

        decode_body(&resp.body)
    }
}

/// Decode a successful body. An empty body (e.g. 204) decodes as JSON `null`,
/// which suits `Option<T>` and `()` destinations.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let payload: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(payload).map_err(|source| Error::Decode {
        source,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}
