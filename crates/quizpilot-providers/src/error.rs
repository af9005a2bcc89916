//! Provider error types.

use thiserror::Error;

use quizpilot_core::QuizError;

/// Why a single request to the inference service failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("HTTP 429 (quota exceeded)")]
    RateLimited,

    /// The credential was rejected (HTTP 401).
    #[error("HTTP 401 (invalid API key): {0}")]
    AuthenticationFailed(String),

    /// The credential is not allowed to call the model (HTTP 403).
    #[error("HTTP 403 (key blocked or forbidden): {0}")]
    Forbidden(String),

    /// The reply carried no usable candidates (empty or blocked).
    #[error("empty or blocked response: {0}")]
    Blocked(String),

    /// The API returned another error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// No credential is configured.
    #[error("no API key configured")]
    NoCredential,

    /// The endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ProviderError {
    /// Returns `true` if switching to another credential may help.
    pub fn offers_rotation(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited
                | ProviderError::AuthenticationFailed(_)
                | ProviderError::Forbidden(_)
                | ProviderError::Blocked(_)
                | ProviderError::Timeout(_)
                | ProviderError::NetworkError(_)
        )
    }
}

impl From<ProviderError> for QuizError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Timeout(_)
            | ProviderError::NetworkError(_)
            | ProviderError::InvalidEndpoint(_) => QuizError::Transport(e.to_string()),
            ProviderError::RateLimited
            | ProviderError::AuthenticationFailed(_)
            | ProviderError::Forbidden(_)
            | ProviderError::Blocked(_)
            | ProviderError::ApiError { .. }
            | ProviderError::NoCredential => QuizError::ServiceRejection(e.to_string()),
        }
    }
}
