use crate::client::core::ApiClient;
use crate::client::policy::RetryPolicy;
use crate::client::preflight;
use crate::config::ClientConfig;
use crate::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for creating clients with custom configuration.
///
/// Starts from [`ClientConfig::default`]; every setter overrides one field.
/// The transport and the rate limiter can be injected, which is how tests run
/// the client against a scripted transport and how several clients share one
/// account quota.
pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            rate_limiter: None,
        }
    }

    /// Start from `WB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(ClientConfig::from_env()?))
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Override the base URL (mock servers, proxies).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Sustained rate in requests per minute.
    pub fn rate_limit(mut self, per_minute: u32) -> Self {
        self.config.rate_limit = per_minute;
        self
    }

    pub fn burst_limit(mut self, burst: u32) -> Self {
        self.config.burst_limit = burst;
        self
    }

    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.config.retry_attempts = attempts;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn default_retry_wait(mut self, wait: Duration) -> Self {
        self.config.default_retry_wait = wait;
        self
    }

    pub fn retry_hint_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.retry_hint_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Inject a transport instead of the default reqwest one.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing limiter, so the quota spans every client built with it.
    ///
    /// `rate_limit` and `burst_limit` are then ignored for admission.
    pub fn shared_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<ApiClient> {
        let config = self.config;
        config.validate()?;

        let base_url = config.parsed_base_url()?;
        let headers = preflight::default_headers(&config.api_key)?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(config.timeout)?),
        };

        let rate_limiter = self.rate_limiter.unwrap_or_else(|| {
            Arc::new(RateLimiter::new(RateLimiterConfig::per_minute(
                config.rate_limit,
                config.burst_limit,
            )))
        });

        let policy = RetryPolicy {
            max_attempts: config.retry_attempts,
            default_retry_wait: config.default_retry_wait,
        };

        debug!(
            base_url = base_url.as_str(),
            rate_limit = config.rate_limit,
            burst_limit = config.burst_limit,
            retry_attempts = config.retry_attempts,
            timeout_ms = config.timeout.as_millis() as u64,
            "wb api client built"
        );

        Ok(ApiClient {
            config: Arc::new(config),
            base_url,
            headers,
            transport,
            rate_limiter,
            policy,
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
