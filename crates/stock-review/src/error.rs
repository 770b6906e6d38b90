//! Error taxonomy for review generation
//!
//! The core never builds transport responses itself: it returns a
//! [`ReviewError`] and the boundary layer turns it into an [`ErrorResponse`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Upstream service an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Upstream {
    /// Market-data provider (quotes, profiles, analyst data)
    Finnhub,
    /// Filings provider (ticker directory, company facts)
    SecEdgar,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Finnhub => f.write_str("Finnhub"),
            Upstream::SecEdgar => f.write_str("SEC EDGAR"),
        }
    }
}

/// Stock review errors
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Credentials rejected by a provider
    #[error("{provider} rejected the configured API key")]
    Unauthorized { provider: Upstream },

    /// Provider signalled rate limiting
    #[error("Rate limit exceeded for {provider}")]
    RateLimited { provider: Upstream },

    /// Provider did not answer within the configured timeout
    #[error("{provider} did not respond in time")]
    UpstreamTimeout { provider: Upstream },

    /// Symbol could not be resolved to a company
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// A required credential or setting is missing
    #[error("Configuration error: {0}")]
    Misconfigured(String),

    /// Generated content could not be parsed
    #[error("Content parse error: {0}")]
    ContentParse(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for review operations
pub type Result<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    /// Rate-limit condition, the only one retried locally
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ReviewError::RateLimited { .. })
    }

    /// Whether the caller may retry the whole request later
    pub fn is_retryable(&self) -> bool {
        match self {
            ReviewError::RateLimited { .. }
            | ReviewError::UpstreamTimeout { .. }
            | ReviewError::Http(_)
            | ReviewError::Json(_)
            | ReviewError::Internal(_) => true,
            ReviewError::Unauthorized { .. }
            | ReviewError::UnknownSymbol(_)
            | ReviewError::Misconfigured(_)
            | ReviewError::ContentParse(_) => false,
        }
    }

    /// Stable error code for the failure response
    pub fn code(&self) -> ErrorCode {
        match self {
            ReviewError::Unauthorized {
                provider: Upstream::Finnhub,
            } => ErrorCode::FinnhubUnauthorized,
            ReviewError::Unauthorized { .. } => ErrorCode::Unauthorized,
            ReviewError::RateLimited {
                provider: Upstream::Finnhub,
            } => ErrorCode::FinnhubRateLimit,
            ReviewError::RateLimited {
                provider: Upstream::SecEdgar,
            } => ErrorCode::SecRateLimit,
            ReviewError::UpstreamTimeout { .. } => ErrorCode::UpstreamTimeout,
            ReviewError::UnknownSymbol(_) => ErrorCode::UnknownSymbol,
            ReviewError::Misconfigured(_) => ErrorCode::Misconfigured,
            ReviewError::ContentParse(_) => ErrorCode::DataParseError,
            ReviewError::Http(_) | ReviewError::Json(_) | ReviewError::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Build the structured failure object
    pub fn to_response(&self, request_id: impl Into<String>) -> ErrorResponse {
        ErrorResponse {
            error_code: self.code(),
            message: self.to_string(),
            request_id: request_id.into(),
            retryable: self.is_retryable(),
            details: None,
        }
    }
}

/// Error codes exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Misconfigured,
    FinnhubRateLimit,
    FinnhubUnauthorized,
    SecRateLimit,
    UnknownSymbol,
    /// Reserved for callers that require fundamentals; a review renders without them
    NoSecData,
    DataParseError,
    UpstreamTimeout,
    InternalError,
}

/// Structured failure response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub message: String,
    pub request_id: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
