//! Request preparation and admission.

use crate::context::RequestContext;
use crate::{Error, ErrorContext, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use url::Url;

use super::core::ApiClient;

impl ApiClient {
    /// Wait for a rate limiter token on behalf of one attempt.
    pub(crate) async fn admit(&self, ctx: &RequestContext) -> Result<()> {
        self.rate_limiter
            .acquire(ctx)
            .await
            .map_err(|reason| Error::cancelled("rate limiter wait", reason))
    }
}

/// Static headers sent with every request.
///
/// The key goes out verbatim; the remote service does not accept a `Bearer` scheme.
pub(crate) fn default_headers(api_key: &str) -> Result<HeaderMap> {
    let mut auth = HeaderValue::from_str(api_key.trim()).map_err(|_| {
        Error::configuration_with_context(
            "api_key contains characters not allowed in an HTTP header",
            ErrorContext::new()
                .with_field_path("wb.api_key")
                .with_source("request_builder"),
        )
    })?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// `base` + `path`, with `query` appended as a standard form-encoded query string.
pub(crate) fn resolve_url(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url> {
    let base = base.as_str().trim_end_matches('/');
    let joined = if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    };

    let mut url = Url::parse(&joined).map_err(|e| {
        Error::invalid_request_with_context(
            format!("invalid url: {}", e),
            ErrorContext::new()
                .with_field_path("request.path")
                .with_details(path)
                .with_source("request_builder"),
        )
    })?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Extract the first non-empty value among `names`.
pub(crate) fn header_first<S: AsRef<str>>(headers: &HeaderMap, names: &[S]) -> Option<String> {
    for name in names {
        if let Some(v) = headers.get(name.as_ref()) {
            if let Ok(s) = v.to_str() {
                let s = s.trim();
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Provider retry hint: a number of seconds to wait after a 429.
///
/// Only the numeric form is understood; anything else counts as absent.
pub(crate) fn retry_after<S: AsRef<str>>(headers: &HeaderMap, names: &[S]) -> Option<Duration> {
    let raw = header_first(headers, names)?;
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let secs: f64 = raw.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}
