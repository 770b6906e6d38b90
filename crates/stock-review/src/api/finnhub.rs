//! Finnhub market-data gateway
//!
//! Four independent token-authenticated GET endpoints keyed by symbol. Each
//! call is wrapped in the configured [`RetryPolicy`]; a 429 is the only
//! condition retried by default.

use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError, Upstream};
use crate::retry::RetryPolicy;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Market-data endpoints used by a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketEndpoint {
    Quote,
    Profile,
    Recommendations,
    PriceTarget,
}

impl MarketEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            MarketEndpoint::Quote => "quote",
            MarketEndpoint::Profile => "stock/profile2",
            MarketEndpoint::Recommendations => "stock/recommendation",
            MarketEndpoint::PriceTarget => "stock/price-target",
        }
    }
}

impl fmt::Display for MarketEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Real-time quote
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quote {
    #[serde(rename = "c")]
    pub current: Option<f64>,
    #[serde(rename = "d")]
    pub change: Option<f64>,
    #[serde(rename = "dp")]
    pub change_pct: Option<f64>,
    #[serde(rename = "h")]
    pub high: Option<f64>,
    #[serde(rename = "l")]
    pub low: Option<f64>,
    #[serde(rename = "o")]
    pub open: Option<f64>,
    #[serde(rename = "pc")]
    pub previous_close: Option<f64>,
}

impl Quote {
    /// Current price, zero when the provider sent none
    pub fn price(&self) -> f64 {
        self.current.unwrap_or(0.0)
    }
}

/// Company profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub exchange: Option<String>,
    pub finnhub_industry: Option<String>,
    pub weburl: Option<String>,
    pub logo: Option<String>,
    /// Millions of `currency`
    pub market_capitalization: Option<f64>,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub ipo: Option<String>,
    pub description: Option<String>,
}

impl CompanyProfile {
    /// Display name, if the provider resolved the symbol
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Analyst recommendation counts for one period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationSnapshot {
    pub period: Option<String>,
    #[serde(deserialize_with = "null_as_zero")]
    pub strong_buy: u32,
    #[serde(deserialize_with = "null_as_zero")]
    pub buy: u32,
    #[serde(deserialize_with = "null_as_zero")]
    pub hold: u32,
    #[serde(deserialize_with = "null_as_zero")]
    pub sell: u32,
    #[serde(deserialize_with = "null_as_zero")]
    pub strong_sell: u32,
}

/// The provider sends `null` for periods where a bucket had no analysts
fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}

/// Analyst price targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriceTarget {
    pub target_mean: Option<f64>,
    pub target_median: Option<f64>,
    pub target_high: Option<f64>,
    pub target_low: Option<f64>,
    pub last_updated: Option<String>,
}

/// Result of the concurrent fan-out
///
/// Every slot is always populated; a slot whose call raised holds its default
/// value and the error is kept in `failures`.
#[derive(Debug, Default)]
pub struct MarketSnapshot {
    pub quote: Quote,
    pub profile: CompanyProfile,
    /// Newest period first
    pub recommendations: Vec<RecommendationSnapshot>,
    pub price_target: PriceTarget,
    pub failures: Vec<(MarketEndpoint, ReviewError)>,
}

impl MarketSnapshot {
    pub fn failed(&self, endpoint: MarketEndpoint) -> bool {
        self.failures.iter().any(|(e, _)| *e == endpoint)
    }

    /// Whether any call was rejected for bad credentials
    pub fn unauthorized(&self) -> bool {
        self.failures
            .iter()
            .any(|(_, err)| matches!(err, ReviewError::Unauthorized { .. }))
    }

    /// Remove and return the error recorded for `endpoint`
    pub fn take_failure(&mut self, endpoint: MarketEndpoint) -> Option<ReviewError> {
        let index = self.failures.iter().position(|(e, _)| *e == endpoint)?;
        Some(self.failures.remove(index).1)
    }
}

/// Market-data client, scoped to one request
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl FinnhubClient {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Create a client from the service configuration
    pub fn from_config(config: &ReviewConfig) -> Result<Self> {
        let api_key = config.require_finnhub_key()?;
        Self::new(
            api_key,
            config.finnhub_base_url.clone(),
            config.finnhub_timeout,
            config.retry.clone(),
        )
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote> {
        self.request(MarketEndpoint::Quote, symbol).await
    }

    pub async fn profile(&self, symbol: &str) -> Result<CompanyProfile> {
        self.request(MarketEndpoint::Profile, symbol).await
    }

    pub async fn recommendations(&self, symbol: &str) -> Result<Vec<RecommendationSnapshot>> {
        self.request(MarketEndpoint::Recommendations, symbol).await
    }

    pub async fn price_target(&self, symbol: &str) -> Result<PriceTarget> {
        self.request(MarketEndpoint::PriceTarget, symbol).await
    }

    /// Fetch all four datasets concurrently
    ///
    /// A failing call neither cancels nor poisons the others.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self, symbol: &str) -> MarketSnapshot {
        let (quote, profile, recommendations, price_target) = tokio::join!(
            self.quote(symbol),
            self.profile(symbol),
            self.recommendations(symbol),
            self.price_target(symbol),
        );

        let mut failures = Vec::new();
        let quote = settle(MarketEndpoint::Quote, quote, &mut failures);
        let profile = settle(MarketEndpoint::Profile, profile, &mut failures);
        let recommendations = settle(
            MarketEndpoint::Recommendations,
            recommendations,
            &mut failures,
        );
        let price_target = settle(MarketEndpoint::PriceTarget, price_target, &mut failures);

        MarketSnapshot {
            quote,
            profile,
            recommendations,
            price_target,
            failures,
        }
    }

    async fn request<T>(&self, endpoint: MarketEndpoint, symbol: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        self.retry
            .execute(endpoint.path(), || self.request_once(endpoint, symbol))
            .await
    }

    #[instrument(skip(self, endpoint), fields(endpoint = %endpoint))]
    async fn request_once<T>(&self, endpoint: MarketEndpoint, symbol: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let url = format!("{}/{}", self.base_url, endpoint.path());

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await.map_err(transport_error)?;
                debug!(bytes = body.len(), "Finnhub response received");
                Ok(serde_json::from_slice(&body)?)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Finnhub rate limit hit");
                Err(ReviewError::RateLimited {
                    provider: Upstream::Finnhub,
                })
            }
            StatusCode::UNAUTHORIZED => {
                error!("Finnhub unauthorized - check API key");
                Err(ReviewError::Unauthorized {
                    provider: Upstream::Finnhub,
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(%status, body = %body, "Finnhub error, using empty result");
                Ok(T::default())
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> ReviewError {
    if err.is_timeout() {
        error!("Finnhub timeout");
        ReviewError::UpstreamTimeout {
            provider: Upstream::Finnhub,
        }
    } else {
        ReviewError::Http(err)
    }
}

fn settle<T: Default>(
    endpoint: MarketEndpoint,
    result: Result<T>,
    failures: &mut Vec<(MarketEndpoint, ReviewError)>,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            error!(%endpoint, error = %err, "Error fetching market data");
            failures.push((endpoint, err));
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(MarketEndpoint::Quote.path(), "quote");
        assert_eq!(MarketEndpoint::Profile.path(), "stock/profile2");
        assert_eq!(MarketEndpoint::Recommendations.path(), "stock/recommendation");
        assert_eq!(MarketEndpoint::PriceTarget.path(), "stock/price-target");
    }

    #[test]
    fn test_payloads_decode() {
        let quote: Quote =
            serde_json::from_str(r#"{"c":50.0,"d":-6.8,"dp":-12.0,"h":57,"l":49.5,"o":56,"pc":56.8,"t":1}"#)
                .unwrap();
        assert_eq!(quote.price(), 50.0);
        assert_eq!(quote.change_pct, Some(-12.0));

        let profile: CompanyProfile = serde_json::from_str(
            r#"{"name":"Acme Corp","exchange":"NASDAQ NMS - GLOBAL MARKET","finnhubIndustry":"Technology","marketCapitalization":1234.5}"#,
        )
        .unwrap();
        assert_eq!(profile.display_name(), Some("Acme Corp"));
        assert_eq!(profile.finnhub_industry.as_deref(), Some("Technology"));

        let recs: Vec<RecommendationSnapshot> = serde_json::from_str(
            r#"[{"period":"2024-06-01","strongBuy":2,"buy":1,"hold":0,"sell":0,"strongSell":0,"symbol":"ACME"}]"#,
        )
        .unwrap();
        assert_eq!(recs[0].strong_buy, 2);

        let target: PriceTarget =
            serde_json::from_str(r#"{"targetMean":60.0,"targetHigh":70,"targetLow":null}"#).unwrap();
        assert_eq!(target.target_mean, Some(60.0));
        assert_eq!(target.target_low, None);
    }

    #[test]
    fn test_null_recommendation_counts_are_zero() {
        let recs: Vec<RecommendationSnapshot> = serde_json::from_str(
            r#"[{"period":"2024-06-01","strongBuy":3,"buy":null,"hold":null,"sell":1,"symbol":"ACME"}]"#,
        )
        .unwrap();
        assert_eq!(recs[0].strong_buy, 3);
        assert_eq!(recs[0].buy, 0);
        assert_eq!(recs[0].hold, 0);
        assert_eq!(recs[0].sell, 1);
        assert_eq!(recs[0].strong_sell, 0);
    }

    #[test]
    fn test_empty_profile_has_no_name() {
        let profile: CompanyProfile = serde_json::from_str("{}").unwrap();
        assert!(profile.display_name().is_none());

        let blank = CompanyProfile {
            name: Some("  ".to_string()),
            ..CompanyProfile::default()
        };
        assert!(blank.display_name().is_none());
    }

    #[test]
    fn test_snapshot_failures() {
        let mut snapshot = MarketSnapshot::default();
        snapshot.failures.push((
            MarketEndpoint::Profile,
            ReviewError::UpstreamTimeout {
                provider: Upstream::Finnhub,
            },
        ));

        assert!(snapshot.failed(MarketEndpoint::Profile));
        assert!(!snapshot.unauthorized());
        assert!(snapshot.take_failure(MarketEndpoint::Profile).is_some());
        assert!(!snapshot.failed(MarketEndpoint::Profile));
    }

    #[test]
    fn test_missing_key_is_misconfigured() {
        let config = ReviewConfig::default();
        assert!(matches!(
            FinnhubClient::from_config(&config),
            Err(ReviewError::Misconfigured(_))
        ));
    }
}
