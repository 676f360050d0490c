//! Transport errors raised by the adapters

use assistant_core::AgentError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Connection, timeout or body read failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the provider
    #[error("{provider} API error ({status}): {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected wire format
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Http(e) if e.is_timeout() => Self::Provider("request timed out".into()),
            other => Self::Provider(other.to_string()),
        }
    }
}

/// Turn a non-success response into [`ProviderError::Status`]
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider, status, "Provider returned an error status");
    Err(ProviderError::Status {
        provider,
        status,
        body,
    })
}
