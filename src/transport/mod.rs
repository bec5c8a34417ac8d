//! HTTP transport seam.
//!
//! The request executor never talks to sockets directly: it hands a fully
//! prepared [`TransportRequest`] to an [`HttpTransport`] and gets back the raw
//! status, headers and the complete body. Production code uses
//! [`http::ReqwestTransport`]; tests substitute scripted transports.

pub mod http;

pub use self::http::ReqwestTransport;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::time::Duration;
use url::Url;

/// One outbound HTTP exchange, ready to send.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Upper bound for this single exchange, including reading the body.
    pub timeout: Option<Duration>,
}

/// The raw answer of the remote side; the body is always fully read.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy for invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a single request. Implementations must not retry or rate limit.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Failures below the HTTP layer: the server never produced a usable response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timeout: {0}")]
    Timeout(String),

    #[error("connection refused or unreachable: {0}")]
    Connect(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Transport error: {0}")]
    Other(String),

    /// The request could not be built; sending it again fails the same way.
    #[error("invalid request: {0}")]
    Build(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Build(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // Render the whole source chain; hyper puts the useful part ("dns error",
        // "Connection refused") in the innermost error.
        let message = render_chain(&err);
        if err.is_builder() {
            TransportError::Build(message)
        } else if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_request() || err.is_body() || err.is_decode() {
            TransportError::Http(message)
        } else {
            TransportError::Other(message)
        }
    }
}

fn render_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
