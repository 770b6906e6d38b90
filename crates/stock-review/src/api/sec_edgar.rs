//! SEC EDGAR filing fact store client
//!
//! Resolves tickers to 10-digit CIKs through the bulk ticker directory and
//! downloads a filer's company-facts repository. Nothing here fails a review:
//! every problem is logged and reported as missing data.
//!
//! Rate limit: 10 requests per second (SEC fair access policy), shared by all
//! clients created from one service.

use crate::analysis::{CompanyFacts, FundamentalsBundle};
use crate::cache::CikCache;
use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError, Upstream};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Build the limiter shared by every filings client of a service
pub fn sec_rate_limiter(requests_per_second: u32) -> SharedRateLimiter {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rate)))
}

/// Entry of the bulk ticker directory
#[derive(Debug, Deserialize)]
struct TickerEntry {
    /// Sent as a number, tolerated as a string
    cik_str: serde_json::Value,
    ticker: String,
}

impl TickerEntry {
    fn padded_cik(&self) -> Option<String> {
        let raw = match &self.cik_str {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.trim().to_string(),
            _ => return None,
        };
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(format!("{raw:0>10}"))
    }
}

/// Filings client, scoped to one request
pub struct SecEdgarClient {
    client: Client,
    tickers_url: String,
    data_base_url: String,
    cache: CikCache,
    rate_limiter: SharedRateLimiter,
}

impl SecEdgarClient {
    /// Create a client sharing the service-wide cache and limiter
    pub fn new(
        config: &ReviewConfig,
        cache: CikCache,
        rate_limiter: SharedRateLimiter,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.sec_user_agent.clone())
            .default_headers(headers)
            .timeout(config.sec_timeout)
            .build()?;

        Ok(Self {
            client,
            tickers_url: config.sec_tickers_url.clone(),
            data_base_url: config.sec_data_base_url.trim_end_matches('/').to_string(),
            cache,
            rate_limiter,
        })
    }

    /// Resolve a ticker to its zero-padded CIK
    ///
    /// On a cache miss the whole directory is downloaded once and every entry
    /// is cached, not only the one asked for.
    #[instrument(skip(self))]
    pub async fn resolve_identifier(&self, ticker: &str) -> Option<String> {
        let ticker = ticker.trim().to_uppercase();
        if let Some(cik) = self.cache.get(&ticker).await {
            debug!(%cik, "CIK cache hit");
            return Some(cik);
        }

        let directory: HashMap<String, TickerEntry> = match self.get_json(&self.tickers_url).await
        {
            Ok(Some(directory)) => directory,
            Ok(None) => return None,
            Err(e) => {
                error!(error = %e, code = ?e.code(), "Error fetching SEC ticker directory");
                return None;
            }
        };

        let mut found = None;
        let entries: Vec<(String, String)> = directory
            .into_values()
            .filter_map(|entry| {
                let cik = entry.padded_cik()?;
                let entry_ticker = entry.ticker.trim().to_uppercase();
                if entry_ticker == ticker {
                    found = Some(cik);
                    return None;
                }
                Some((entry_ticker, cik))
            })
            .collect();

        debug!(entries = entries.len(), "Populating CIK cache");
        self.cache.insert_many(entries).await;

        match &found {
            // Written last so a directory larger than the cache cannot evict it
            Some(cik) => self.cache.insert(ticker, cik.clone()).await,
            None => info!("Ticker not present in SEC directory"),
        }
        found
    }

    /// Download a filer's company-facts repository
    #[instrument(skip(self))]
    pub async fn fetch_facts(&self, cik: &str) -> Option<CompanyFacts> {
        let url = format!("{}/api/xbrl/companyfacts/CIK{cik}.json", self.data_base_url);

        match self.get_json(&url).await {
            Ok(facts) => facts,
            Err(e) => {
                error!(error = %e, code = ?e.code(), "Error fetching company facts");
                None
            }
        }
    }

    /// Resolve, fetch and extract the three fundamentals tables
    #[instrument(skip(self))]
    pub async fn build_fundamentals(&self, symbol: &str) -> Option<FundamentalsBundle> {
        let Some(cik) = self.resolve_identifier(symbol).await else {
            info!("No CIK found");
            return None;
        };

        let facts = self.fetch_facts(&cik).await?;
        if facts.facts.us_gaap.is_empty() {
            info!(%cik, "Filer reports no us-gaap facts");
            return None;
        }

        Some(FundamentalsBundle::from_facts(&facts))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        self.rate_limiter.until_ready().await;

        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<T>().await?)),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(url, "SEC rate limit hit");
                Err(ReviewError::RateLimited {
                    provider: Upstream::SecEdgar,
                })
            }
            StatusCode::NOT_FOUND => {
                info!(url, "No SEC data");
                Ok(None)
            }
            status => {
                error!(%status, url, "SEC request failed");
                Ok(None)
            }
        }
    }
}
