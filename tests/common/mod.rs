//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use wb_api_client::{
    ApiClient, ApiClientBuilder, HttpTransport, TransportError, TransportRequest,
    TransportResponse,
};

/// One scripted reaction of the fake server.
pub enum Step {
    Respond {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: String,
    },
    Fail(TransportError),
    /// Fails only after the given latency.
    FailAfter(Duration, TransportError),
    /// Never answers; only cancellation ends the exchange.
    Hang,
}

impl Step {
    pub fn json(status: u16, body: &str) -> Self {
        Step::Respond {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn throttled(retry_secs: Option<u64>) -> Self {
        Step::Respond {
            status: 429,
            headers: retry_secs
                .map(|s| vec![("x-ratelimit-retry", s.to_string())])
                .unwrap_or_default(),
            body: r#"{"title":"too many requests"}"#.to_string(),
        }
    }

    pub fn refused() -> Self {
        Step::Fail(TransportError::Connect(
            "dial tcp 127.0.0.1:443: connection refused".to_string(),
        ))
    }
}

/// Plays back [`Step`]s in order, then answers every further request with
/// `fallback` (a 200 ping by default).
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: (u16, String),
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
    sent_at: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            fallback: (
                200,
                r#"{"TS":"2024-08-16T11:19:05+03:00","Status":"OK"}"#.to_string(),
            ),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            sent_at: Mutex::new(Vec::new()),
        })
    }

    pub fn always_ok() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Instants at which each exchange started.
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent_at.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request);

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond {
                status,
                headers,
                body,
            }) => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.insert(
                        HeaderName::from_static(name),
                        HeaderValue::from_str(&value).unwrap(),
                    );
                }
                Ok(TransportResponse {
                    status,
                    headers: map,
                    body: Bytes::from(body),
                })
            }
            Some(Step::Fail(err)) => Err(err),
            Some(Step::FailAfter(latency, err)) => {
                tokio::time::sleep(latency).await;
                Err(err)
            }
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(TransportResponse {
                status: self.fallback.0,
                headers: HeaderMap::new(),
                body: Bytes::from(self.fallback.1.clone()),
            }),
        }
    }
}

/// Client over `transport` with a generous quota, so admission never delays a test
/// unless the test asks for a tight one.
pub fn client_with(transport: Arc<ScriptedTransport>) -> ApiClient {
    builder_with(transport).build().unwrap()
}

pub fn builder_with(transport: Arc<ScriptedTransport>) -> ApiClientBuilder {
    ApiClientBuilder::new()
        .api_key("test-key")
        .base_url("https://wb.test")
        .rate_limit(6000)
        .burst_limit(50)
        .retry_attempts(3)
        .timeout(Duration::from_secs(30))
        .default_retry_wait(Duration::from_secs(1))
        .transport(transport)
}
