//! Analysis service seam
//!
//! The pipeline submits prompts and receives text through this trait; the
//! concrete vendor client lives behind it. Errors are typed so the retry
//! layer can classify them without sniffing strings.

use async_trait::async_trait;

use crate::retry::RetryClass;

/// Analysis service errors
#[derive(Debug, thiserror::Error)]
pub enum AnalysisServiceError {
    /// The service metered us out (HTTP 429 class); trips the limiter
    /// cooldown
    #[error("analysis service quota exceeded")]
    QuotaExceeded,

    /// The service is overloaded (HTTP 500/503/529 class)
    #[error("analysis service overloaded (status {0})")]
    Overloaded(u16),

    /// Any other non-success HTTP response
    #[error("analysis service error ({status}): {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out
    #[error("analysis service response timeout")]
    Timeout,

    /// Invalid or missing API credentials
    #[error("invalid API key: {0}")]
    InvalidKey(String),

    /// A success response with no usable text payload
    #[error("analysis service returned an empty response")]
    EmptyResponse,

    /// The local rate limiter denied every admission attempt
    #[error("rate limiter denied the call")]
    RateLimited,
}

impl RetryClass for AnalysisServiceError {
    fn is_retryable(&self) -> bool {
        match self {
            AnalysisServiceError::QuotaExceeded
            | AnalysisServiceError::Overloaded(_)
            | AnalysisServiceError::Network(_)
            | AnalysisServiceError::Timeout
            | AnalysisServiceError::RateLimited => true,
            AnalysisServiceError::Http { status, .. } => *status >= 500,
            AnalysisServiceError::InvalidKey(_) | AnalysisServiceError::EmptyResponse => false,
        }
    }

    fn is_quota(&self) -> bool {
        matches!(self, AnalysisServiceError::QuotaExceeded)
    }

    fn rate_limited() -> Self {
        AnalysisServiceError::RateLimited
    }
}

/// Remote model access
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Submit a prompt; the text payload is expected, but not guaranteed,
    /// to contain JSON
    async fn submit(&self, prompt: &str) -> Result<String, AnalysisServiceError>;
}
