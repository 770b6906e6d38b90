//! Configuration for review generation

use crate::error::{Result, ReviewError};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the market-data API key
pub const ENV_FINNHUB_API_KEY: &str = "KITCHEN_FINNHUB_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "KITCHEN_ANTHROPIC_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "KITCHEN_OPENAI_API_KEY";
pub const ENV_ANTHROPIC_MODEL: &str = "KITCHEN_ANTHROPIC_MODEL";
pub const ENV_OPENAI_MODEL: &str = "KITCHEN_OPENAI_MODEL";
pub const ENV_SEC_USER_AGENT: &str = "KITCHEN_SEC_USER_AGENT";
pub const ENV_SITE_URL: &str = "KITCHEN_SITE_URL";

/// Configuration for the review service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Market-data API key; required at request time
    pub finnhub_api_key: Option<String>,

    /// Credentials for the narrative providers, in priority order
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,

    pub anthropic_model: String,
    pub openai_model: String,

    /// Descriptive User-Agent demanded by the filings provider
    pub sec_user_agent: String,

    pub finnhub_base_url: String,
    pub sec_tickers_url: String,
    pub sec_data_base_url: String,

    pub finnhub_timeout: Duration,
    pub sec_timeout: Duration,

    /// Shared across all concurrent requests
    pub sec_requests_per_second: u32,

    pub cik_cache_ttl: Duration,
    pub cik_cache_capacity: usize,

    /// Applied to every market-data call
    pub retry: RetryPolicy,

    /// Public site used for canonical links
    pub site_base_url: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_model: "claude-sonnet-4-20250514".to_string(),
            openai_model: "gpt-4o".to_string(),
            sec_user_agent: "stock-review contact@example.com".to_string(),
            finnhub_base_url: "https://finnhub.io/api/v1".to_string(),
            sec_tickers_url: "https://www.sec.gov/files/company_tickers.json".to_string(),
            sec_data_base_url: "https://data.sec.gov".to_string(),
            finnhub_timeout: Duration::from_secs(10),
            sec_timeout: Duration::from_secs(15),
            sec_requests_per_second: 10,
            cik_cache_ttl: Duration::from_secs(24 * 60 * 60),
            cik_cache_capacity: 10_000,
            retry: RetryPolicy::default(),
            site_base_url: "https://msl.org.il".to_string(),
        }
    }
}

impl ReviewConfig {
    /// Create a new configuration builder
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder::default()
    }

    /// Load settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self {
            finnhub_api_key: read(ENV_FINNHUB_API_KEY),
            anthropic_api_key: read(ENV_ANTHROPIC_API_KEY),
            openai_api_key: read(ENV_OPENAI_API_KEY),
            ..Self::default()
        };

        if let Some(model) = read(ENV_ANTHROPIC_MODEL) {
            config.anthropic_model = model;
        }
        if let Some(model) = read(ENV_OPENAI_MODEL) {
            config.openai_model = model;
        }
        if let Some(agent) = read(ENV_SEC_USER_AGENT) {
            config.sec_user_agent = agent;
        }
        if let Some(site) = read(ENV_SITE_URL) {
            config.site_base_url = site.trim_end_matches('/').to_string();
        }

        config
    }

    /// Market-data key, or the fatal configuration error
    pub fn require_finnhub_key(&self) -> Result<&str> {
        self.finnhub_api_key
            .as_deref()
            .ok_or_else(|| ReviewError::Misconfigured(format!("{ENV_FINNHUB_API_KEY} is not set")))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ReviewError::Misconfigured(
                "retry.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.cik_cache_capacity == 0 {
            return Err(ReviewError::Misconfigured(
                "cik_cache_capacity must be greater than 0".to_string(),
            ));
        }

        if self.sec_requests_per_second == 0 {
            return Err(ReviewError::Misconfigured(
                "sec_requests_per_second must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for ReviewConfig
#[derive(Debug, Default)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.finnhub_api_key = Some(key.into());
        self
    }

    pub fn anthropic_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.anthropic_api_key = Some(key.into());
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn anthropic_model(mut self, model: impl Into<String>) -> Self {
        self.config.anthropic_model = model.into();
        self
    }

    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.config.openai_model = model.into();
        self
    }

    pub fn sec_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.sec_user_agent = agent.into();
        self
    }

    /// Point the market-data gateway at another host (mock servers in tests)
    pub fn finnhub_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.finnhub_base_url = url.into();
        self
    }

    pub fn sec_tickers_url(mut self, url: impl Into<String>) -> Self {
        self.config.sec_tickers_url = url.into();
        self
    }

    pub fn sec_data_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.sec_data_base_url = url.into();
        self
    }

    pub fn finnhub_timeout(mut self, timeout: Duration) -> Self {
        self.config.finnhub_timeout = timeout;
        self
    }

    pub fn sec_timeout(mut self, timeout: Duration) -> Self {
        self.config.sec_timeout = timeout;
        self
    }

    pub fn sec_requests_per_second(mut self, rate: u32) -> Self {
        self.config.sec_requests_per_second = rate;
        self
    }

    pub fn cik_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cik_cache_ttl = ttl;
        self
    }

    pub fn cik_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cik_cache_capacity = capacity;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn site_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.site_base_url = url.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ReviewConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
