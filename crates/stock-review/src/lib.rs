//! Stock review generation
//!
//! Aggregates market data, analyst consensus and filed fundamentals for a
//! ticker and renders them as a bilingual `ToolResult` document of widgets,
//! narrative sections and SEO metadata.
//!
//! - Market data (quote, profile, recommendations, price target) from Finnhub
//! - Filed fundamentals from SEC EDGAR company facts, with a shared CIK cache
//! - Analyst consensus scoring and price-target upside
//! - Narrative sections from the first configured LLM provider, falling back
//!   to static content, plus rule-based insights
//!
//! # Example
//!
//! ```rust,ignore
//! use stock_review::{Language, ReviewConfig, StockReviewService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = StockReviewService::new(ReviewConfig::from_env())?;
//!     let review = service.generate_review("AAPL", Language::Hebrew, "req-1").await?;
//!     println!("{}", serde_json::to_string_pretty(&review)?);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod locale;
pub mod retry;
pub mod review;
pub mod schema;

pub use cache::CikCache;
pub use config::ReviewConfig;
pub use content::{NarrativeGenerator, ReviewContext, StaticNarrative, select_generator};
pub use error::{ErrorCode, ErrorResponse, Result, ReviewError, Upstream};
pub use locale::Language;
pub use retry::RetryPolicy;
pub use review::{StockReviewService, normalize_exchange};
pub use schema::{ToolResult, tool_registry};
