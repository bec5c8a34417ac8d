use crate::context::CancelReason;
use crate::error_code::{Diagnosis, ErrorCategory};
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for configuration and request-building failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Configuration key or request part that caused the error (e.g., "wb.rate_limit", "request.path")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "config_validator", "request_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Unified error type of the client.
///
/// Every terminal failure of a call lands in exactly one variant; pass it to
/// [`crate::error_code::classify`] (or call [`Error::category`]) to get a stable
/// diagnostic category.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Invalid request: {message}{}", format_context(.context))]
    InvalidRequest {
        message: String,
        context: ErrorContext,
    },

    #[error("{stage}: {reason}")]
    Cancelled {
        stage: &'static str,
        reason: CancelReason,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error: status {status}, body: {body}")]
    Remote {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("unmarshal error: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("max retries exceeded after {attempts} attempts in {}ms, last error: {}", format_millis(.elapsed), format_last(.last))]
    RetriesExhausted {
        attempts: u32,
        elapsed: Duration,
        last: Option<Box<Error>>,
    },

    #[error("ping status not OK: {status}")]
    PingStatus { status: String },

    #[error("API logic error: {message}")]
    Logic { message: String },
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_millis(elapsed: &Duration) -> u128 {
    elapsed.as_millis()
}

fn format_last(last: &Option<Box<Error>>) -> String {
    match last {
        Some(err) => err.to_string(),
        None => "none".to_string(),
    }
}

impl Error {
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn invalid_request_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidRequest {
            message: msg.into(),
            context,
        }
    }

    pub(crate) fn cancelled(stage: &'static str, reason: CancelReason) -> Self {
        Error::Cancelled { stage, reason }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::InvalidRequest { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// HTTP status of a rejected request, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            Error::RetriesExhausted { last: Some(last), .. } => last.status(),
            _ => None,
        }
    }

    /// Whether the retry controller treats this failure as transient.
    ///
    /// Only transport failures and explicit throttling (HTTP 429) qualify;
    /// any other rejection is final, as is a request that could not be built.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(err) => err.is_retryable(),
            Error::Remote { status: 429, .. } => true,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        crate::error_code::classify(self)
    }

    pub fn diagnose(&self) -> Diagnosis {
        Diagnosis::new(self.category(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_keeps_body() {
        let err = Error::Remote {
            status: 403,
            body: r#"{"title":"access denied"}"#.to_string(),
            retry_after: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("status 403"));
        assert!(msg.contains("access denied"));
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retries_exhausted_names_last_error() {
        let err = Error::RetriesExhausted {
            attempts: 3,
            elapsed: Duration::from_millis(120),
            last: Some(Box::new(Error::Transport(TransportError::Connect(
                "connection refused".to_string(),
            )))),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("max retries exceeded after 3 attempts"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_configuration_error_formats_context() {
        let err = Error::configuration_with_context(
            "rate_limit must be positive",
            ErrorContext::new()
                .with_field_path("wb.rate_limit")
                .with_source("config_validator"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration error: rate_limit must be positive (field: wb.rate_limit, source: config_validator)"
        );
        assert!(err.context().is_some());
    }

    #[test]
    fn test_retryable_variants() {
        let throttled = Error::Remote {
            status: 429,
            body: String::new(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(throttled.is_retryable());
        assert!(Error::Transport(TransportError::Timeout("slow".into())).is_retryable());
        assert!(!Error::cancelled("rate limiter wait", CancelReason::Cancelled).is_retryable());
        assert!(!Error::Transport(TransportError::Build("relative URL".into())).is_retryable());
    }
}
