//! Diagnostic error categories.
//!
//! Every terminal failure of the client maps onto one of five stable
//! categories, each with a machine tag and a canned remediation sentence, so
//! tool-facing layers can present the same diagnosis whichever endpoint failed.
//!
//! ## Priority
//!
//! When the textual heuristics apply, categories are tried in this order and
//! the first match wins:
//!
//! | Order | Category    | Tag                     | Matches                                        |
//! |-------|-------------|-------------------------|------------------------------------------------|
//! | 1     | AuthFailed  | `authentication_failed` | `401`, `unauthorized`, `Forbidden`             |
//! | 2     | Timeout     | `timeout`               | `timeout`, `timed out`, `deadline exceeded`    |
//! | 3     | Network     | `network_error`         | `connection refused`, `no such host`, `dns error` |
//! | 4     | RateLimit   | `rate_limit`            | `429`, `Too Many Requests`                     |
//! | 5     | Unknown     | `unknown`               | anything else                                  |
//!
//! ## Example
//!
//! ```rust
//! use wb_api_client::error_code::ErrorCategory;
//!
//! let category = ErrorCategory::from_message("API error: status 401, body: unauthorized");
//! assert_eq!(category, ErrorCategory::AuthFailed);
//! assert_eq!(category.tag(), "authentication_failed");
//! ```

use crate::context::CancelReason;
use crate::transport::TransportError;
use crate::Error;
use std::fmt;

/// Diagnostic category of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential rejected or missing (401/403)
    AuthFailed,
    /// The call or one of its attempts ran out of time
    Timeout,
    /// The remote host could not be reached
    Network,
    /// The remote service throttled the account (429)
    RateLimit,
    /// Anything that does not match the categories above
    Unknown,
}

impl ErrorCategory {
    /// All categories in classification priority order.
    pub const PRIORITY: [ErrorCategory; 5] = [
        Self::AuthFailed,
        Self::Timeout,
        Self::Network,
        Self::RateLimit,
        Self::Unknown,
    ];

    /// Stable machine tag (e.g., `"rate_limit"`).
    #[inline]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::AuthFailed => "authentication_failed",
            Self::Timeout => "timeout",
            Self::Network => "network_error",
            Self::RateLimit => "rate_limit",
            Self::Unknown => "unknown",
        }
    }

    /// Canned remediation sentence for humans.
    #[inline]
    pub fn human_message(&self) -> &'static str {
        match self {
            Self::AuthFailed => {
                "API key is invalid or missing. Check WB_API_KEY in the configuration."
            }
            Self::Timeout => {
                "The request timed out. The API server is not responding or the network is degraded."
            }
            Self::Network => "The API server is unreachable. Check the network connection.",
            Self::RateLimit => "Request quota exceeded. Wait before the next attempt.",
            Self::Unknown => "Unknown error while calling the API.",
        }
    }

    /// Classify free-form error text.
    ///
    /// Pure and total: the same text always yields the same category.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();

        if message.contains("401") || lower.contains("unauthorized") || message.contains("Forbidden")
        {
            return Self::AuthFailed;
        }

        if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("deadline exceeded")
        {
            return Self::Timeout;
        }

        if lower.contains("connection refused")
            || lower.contains("no such host")
            || lower.contains("dns error")
        {
            return Self::Network;
        }

        if message.contains("429") || message.contains("Too Many Requests") {
            return Self::RateLimit;
        }

        Self::Unknown
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Map a terminal client error onto its diagnostic category.
///
/// Every variant the client raises is decided by its type. Text heuristics only
/// see text that came from outside: a rejected request's body, or the message
/// of a transport failure that carries no typed cause. An aggregate
/// [`Error::RetriesExhausted`] is classified by its last error alone.
pub fn classify(err: &Error) -> ErrorCategory {
    match err {
        Error::Remote {
            status: 401 | 403, ..
        } => ErrorCategory::AuthFailed,
        Error::Remote { status: 429, .. } => ErrorCategory::RateLimit,
        Error::Remote { body, .. } => ErrorCategory::from_message(body),
        Error::Cancelled {
            reason: CancelReason::DeadlineExceeded,
            ..
        } => ErrorCategory::Timeout,
        Error::Cancelled {
            reason: CancelReason::Cancelled,
            ..
        } => ErrorCategory::Unknown,
        Error::Transport(TransportError::Timeout(_)) => ErrorCategory::Timeout,
        Error::Transport(TransportError::Connect(_)) => ErrorCategory::Network,
        Error::Transport(other) => ErrorCategory::from_message(&other.to_string()),
        Error::RetriesExhausted {
            last: Some(last), ..
        } => classify(last),
        Error::RetriesExhausted { last: None, .. }
        | Error::Decode { .. }
        | Error::PingStatus { .. }
        | Error::Logic { .. }
        | Error::Configuration { .. }
        | Error::InvalidRequest { .. } => ErrorCategory::Unknown,
    }
}

/// Classify any error, including ones raised outside this crate.
pub fn classify_dyn(err: &(dyn std::error::Error + 'static)) -> ErrorCategory {
    match err.downcast_ref::<Error>() {
        Some(own) => classify(own),
        None => ErrorCategory::from_message(&err.to_string()),
    }
}

/// A classified failure ready to show to a user or a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub category: ErrorCategory,
    /// Rendered text of the underlying error.
    pub detail: String,
}

impl Diagnosis {
    pub fn new(category: ErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.category.tag()
    }

    pub fn human_message(&self) -> &'static str {
        self.category.human_message()
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.category.tag(),
            self.category.human_message(),
            self.detail
        )
    }
}
