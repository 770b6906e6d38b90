//! API clients for the upstream data providers

pub mod finnhub;
pub mod sec_edgar;

pub use finnhub::{
    CompanyProfile, FinnhubClient, MarketEndpoint, MarketSnapshot, PriceTarget, Quote,
    RecommendationSnapshot,
};
pub use sec_edgar::{SecEdgarClient, SharedRateLimiter, sec_rate_limiter};
