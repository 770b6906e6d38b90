//! Text-generation provider layer for stock-review
//!
//! Provider-agnostic request/response types plus the [`LLMProvider`] trait the
//! narrative generators are written against. Concrete backends live in
//! [`providers`] behind the `anthropic` and `openai` cargo features.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

#[cfg(any(feature = "anthropic", feature = "openai"))]
pub mod providers;
