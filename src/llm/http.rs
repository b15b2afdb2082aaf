//! Shared HTTP plumbing for the REST-based providers.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::LlmError;

/// Build a client with the configured request timeout.
pub(crate) fn build_client(provider: &str, timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: format!("Failed to build HTTP client: {e}"),
        })
}

/// Map a non-success HTTP status to an `LlmError`.
pub(crate) fn status_error(
    provider: &str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthFailed {
            provider: provider.to_string(),
        },
        429 => LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        },
        _ => {
            let preview: String = body.chars().take(300).collect();
            LlmError::RequestFailed {
                provider: provider.to_string(),
                reason: format!("HTTP {status}: {preview}"),
            }
        }
    }
}

/// Map a transport failure to an `LlmError`.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> LlmError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: err.to_string(),
    }
}
