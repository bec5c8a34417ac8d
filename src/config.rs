//! Client configuration surface.
//!
//! The values normally come from the `wb:` section of the application's YAML
//! configuration; missing fields fall back to the defaults below. The client
//! copies the configuration at build time and never mutates it afterwards.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Deserializer};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://content-api.wildberries.ru";
pub const DEFAULT_RATE_LIMIT: u32 = 100;
pub const DEFAULT_BURST_LIMIT: u32 = 5;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_HINT_HEADERS: [&str; 2] = ["X-Ratelimit-Retry", "Retry-After"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Raw API key, sent verbatim in the `Authorization` header.
    pub api_key: String,
    pub base_url: String,
    /// Sustained rate, requests per minute.
    pub rate_limit: u32,
    /// Largest instantaneous spike of admitted requests.
    pub burst_limit: u32,
    /// Attempts per logical call, first attempt included.
    pub retry_attempts: u32,
    /// Per-attempt timeout, e.g. `"30s"`.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Wait after a 429 that carries no retry hint.
    #[serde(deserialize_with = "deserialize_duration")]
    pub default_retry_wait: Duration,
    /// Headers consulted, in order, for the number of seconds to wait after a 429.
    pub retry_hint_headers: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
            burst_limit: DEFAULT_BURST_LIMIT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            default_retry_wait: DEFAULT_RETRY_WAIT,
            retry_hint_headers: DEFAULT_RETRY_HINT_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by environment variables:
    /// `WB_API_KEY`, `WB_BASE_URL`, `WB_RATE_LIMIT`, `WB_BURST_LIMIT`,
    /// `WB_RETRY_ATTEMPTS`, `WB_TIMEOUT` (humantime, e.g. `45s`).
    ///
    /// Unparseable numeric values are reported rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(key) = env::var("WB_API_KEY") {
            cfg.api_key = key;
        }
        if let Ok(url) = env::var("WB_BASE_URL") {
            cfg.base_url = url;
        }
        if let Some(v) = env_number("WB_RATE_LIMIT")? {
            cfg.rate_limit = v;
        }
        if let Some(v) = env_number("WB_BURST_LIMIT")? {
            cfg.burst_limit = v;
        }
        if let Some(v) = env_number("WB_RETRY_ATTEMPTS")? {
            cfg.retry_attempts = v;
        }
        if let Ok(raw) = env::var("WB_TIMEOUT") {
            cfg.timeout = humantime::parse_duration(raw.trim()).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid timeout format: {}", e),
                    ErrorContext::new()
                        .with_field_path("WB_TIMEOUT")
                        .with_details(raw.clone())
                        .with_source("config_env"),
                )
            })?;
        }

        Ok(cfg)
    }

    /// Parse the `wb:` section of a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid wb config: {}", e),
                ErrorContext::new().with_source("config_yaml"),
            )
        })
    }

    /// Sustained rate converted to tokens per second.
    pub fn rate_per_second(&self) -> f64 {
        f64::from(self.rate_limit) / 60.0
    }

    /// Reject configurations the client cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(invalid("wb.api_key", "api_key is required", None));
        }
        if self.rate_limit == 0 {
            return Err(invalid("wb.rate_limit", "rate_limit must be positive", None));
        }
        if self.burst_limit == 0 {
            return Err(invalid("wb.burst_limit", "burst_limit must be positive", None));
        }
        if self.retry_attempts == 0 {
            return Err(invalid(
                "wb.retry_attempts",
                "retry_attempts must be at least 1",
                None,
            ));
        }
        if self.timeout.is_zero() {
            return Err(invalid("wb.timeout", "timeout must be positive", None));
        }
        self.parsed_base_url()?;
        Ok(())
    }

    pub(crate) fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            invalid(
                "wb.base_url",
                &format!("invalid base_url: {}", e),
                Some(self.base_url.clone()),
            )
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "wb.base_url",
                &format!("unsupported scheme: {}", other),
                Some(self.base_url.clone()),
            )),
        }
    }
}

fn invalid(field: &str, message: &str, details: Option<String>) -> Error {
    let mut ctx = ErrorContext::new()
        .with_field_path(field)
        .with_source("config_validator");
    if let Some(d) = details {
        ctx = ctx.with_details(d);
    }
    Error::configuration_with_context(message, ctx)
}

fn env_number(name: &str) -> Result<Option<u32>> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<u32>().map(Some).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid number: {}", e),
                ErrorContext::new()
                    .with_field_path(name)
                    .with_details(raw.clone())
                    .with_source("config_env"),
            )
        }),
        Err(_) => Ok(None),
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom),
    }
}
