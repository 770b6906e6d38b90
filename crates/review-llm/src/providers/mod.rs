//! Concrete LLM provider implementations

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicProvider;
#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIProvider};

/// Map a non-success HTTP status to the matching error
pub(crate) fn status_error(status: reqwest::StatusCode, body: String, model: &str) -> crate::LLMError {
    match status.as_u16() {
        401 | 403 => crate::LLMError::AuthenticationFailed,
        429 => crate::LLMError::RateLimitExceeded(body),
        400 => crate::LLMError::InvalidRequest(body),
        404 => crate::LLMError::ModelNotFound(model.to_string()),
        _ => crate::LLMError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}
