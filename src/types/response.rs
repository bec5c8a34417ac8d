use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// The `{data, error, errorText}` wrapper most endpoints answer with.
///
/// A 200 response may still carry `"error": true`; the client decodes such a
/// body successfully and leaves the check to the caller (or to
/// [`ApiResponse::into_data`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub error_text: String,
}

impl<T> ApiResponse<T> {
    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Unwrap the payload, turning a business-level failure into [`Error::Logic`].
    ///
    /// A `null` or missing `data` yields `T::default()`.
    pub fn into_data(self) -> Result<T>
    where
        T: Default,
    {
        if self.error {
            return Err(Error::Logic {
                message: self.error_text,
            });
        }
        Ok(self.data.unwrap_or_default())
    }
}

pub const PING_OK: &str = "OK";

/// Bare (unwrapped) answer of the health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "TS")]
    pub ts: String,
}

impl PingResponse {
    pub fn is_ok(&self) -> bool {
        self.status == PING_OK
    }
}
