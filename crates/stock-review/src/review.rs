//! Review orchestrator
//!
//! Sequence per request: validate configuration, fan out market data and
//! fundamentals concurrently, require a resolved company, derive consensus and
//! KPIs, assemble widgets, run the content tier, then attach SEO metadata.
//! Market-data failures fail the request; fundamentals and content failures
//! degrade to placeholders.

use crate::analysis::{Distribution, FundamentalsBundle, PriceTargets, round_to, score_consensus};
use crate::api::{FinnhubClient, MarketEndpoint, SecEdgarClient, SharedRateLimiter, sec_rate_limiter};
use crate::cache::CikCache;
use crate::config::ReviewConfig;
use crate::content::{Insight, NarrativeGenerator, ReviewContext, select_generator};
use crate::error::{Result, ReviewError, Upstream};
use crate::locale::{Language, escape_html};
use crate::schema::{
    AnalystCardData, ButtonStyle, ChartEmbed, CtaBoxData, CtaButton, Entity, InsightListData,
    KpiData, NoticeData, NoticeKind, SCHEMA_VERSION, STOCK_REVIEW_TOOL_KEY, Seo, ToolResult,
    Widget, WidgetBody,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_EXCHANGE: &str = "NASDAQ";

/// Provider exchange names and their chart prefixes, matched in order
const EXCHANGE_MAP: [(&str, &str); 8] = [
    ("NASDAQ NMS - GLOBAL MARKET", "NASDAQ"),
    ("NASDAQ NMS", "NASDAQ"),
    ("NASDAQ GLOBAL MARKET", "NASDAQ"),
    ("NASDAQ GLOBAL SELECT", "NASDAQ"),
    ("NEW YORK STOCK EXCHANGE", "NYSE"),
    ("NYSE ARCA", "AMEX"),
    ("NYSE AMERICAN", "AMEX"),
    ("TEL AVIV", "TASE"),
];

/// Map a provider exchange name to a chart exchange prefix
pub fn normalize_exchange(raw: &str) -> String {
    let exchange = raw.trim().to_uppercase();

    if let Some((_, mapped)) = EXCHANGE_MAP.iter().find(|(name, _)| *name == exchange) {
        return (*mapped).to_string();
    }
    if let Some((_, mapped)) = EXCHANGE_MAP.iter().find(|(name, _)| exchange.contains(name)) {
        return (*mapped).to_string();
    }

    let cleaned: String = exchange.chars().filter(char::is_ascii_uppercase).collect();
    if cleaned.is_empty() {
        DEFAULT_EXCHANGE.to_string()
    } else {
        cleaned
    }
}

/// Generates stock reviews
///
/// Holds the process-wide CIK cache and SEC rate limiter. Network clients are
/// created per request and dropped before the request returns.
pub struct StockReviewService {
    config: ReviewConfig,
    cik_cache: CikCache,
    sec_limiter: SharedRateLimiter,
    narrative_override: Option<Arc<dyn NarrativeGenerator>>,
}

impl StockReviewService {
    pub fn new(config: ReviewConfig) -> Result<Self> {
        config.validate()?;

        let cik_cache = CikCache::new(config.cik_cache_capacity, config.cik_cache_ttl);
        let sec_limiter = sec_rate_limiter(config.sec_requests_per_second);

        Ok(Self {
            config,
            cik_cache,
            sec_limiter,
            narrative_override: None,
        })
    }

    /// Use a fixed narrative generator instead of resolving one from configuration
    pub fn with_narrative_generator(mut self, generator: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrative_override = Some(generator);
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn cik_cache(&self) -> &CikCache {
        &self.cik_cache
    }

    fn narrative_generator(&self) -> Arc<dyn NarrativeGenerator> {
        self.narrative_override
            .clone()
            .unwrap_or_else(|| select_generator(&self.config))
    }

    /// Build the complete review of `symbol`
    #[instrument(skip(self, lang, request_id), fields(lang = %lang, request_id = %request_id))]
    pub async fn generate_review(
        &self,
        symbol: &str,
        lang: Language,
        request_id: &str,
    ) -> Result<ToolResult> {
        let finnhub = FinnhubClient::from_config(&self.config)?;
        let sec = SecEdgarClient::new(&self.config, self.cik_cache.clone(), self.sec_limiter.clone())?;

        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ReviewError::UnknownSymbol(symbol));
        }

        info!("Fetching market data and fundamentals");
        let (mut market, fundamentals) =
            tokio::join!(finnhub.fetch_all(&symbol), sec.build_fundamentals(&symbol));
        drop(finnhub);
        drop(sec);

        if market.unauthorized() {
            return Err(ReviewError::Unauthorized {
                provider: Upstream::Finnhub,
            });
        }

        let Some(company_name) = market.profile.display_name().map(str::to_string) else {
            return Err(match market.take_failure(MarketEndpoint::Profile) {
                Some(err) if err.is_retryable() => err,
                _ => ReviewError::UnknownSymbol(symbol),
            });
        };

        let price = market.quote.price();
        let targets = PriceTargets::from_price_target(&market.price_target);
        let consensus = score_consensus(Distribution::latest(&market.recommendations), targets, price);
        let analyst_label = consensus.label.map(|l| l.text(lang).to_string());

        let kpi = KpiData {
            price,
            day_change_pct: market.quote.change_pct,
            analyst_score_1_5: consensus.score,
            analyst_label: analyst_label.clone(),
            analysts_count: consensus.analysts_count,
            price_target_consensus: targets.consensus,
            price_target_upside_pct: consensus.upside_pct.map(|u| round_to(u, 2)),
        };

        let exchange =
            normalize_exchange(market.profile.exchange.as_deref().unwrap_or(DEFAULT_EXCHANGE));

        let mut widgets = vec![
            Widget::new("kpis", WidgetBody::KpiCards(kpi.clone())),
            Widget::new(
                "tv_chart",
                WidgetBody::TradingviewEmbed(ChartEmbed {
                    tv_symbol: format!("{exchange}:{symbol}"),
                    interval: "D".to_string(),
                    theme: "light".to_string(),
                    locale: lang.chart_locale().to_string(),
                    autosize: true,
                    allow_symbol_change: false,
                }),
            ),
            Widget::new(
                "analysts",
                WidgetBody::AnalystCard(AnalystCardData {
                    score_1_5: consensus.score,
                    label: analyst_label,
                    analysts_count: consensus.analysts_count,
                    targets,
                    distribution: consensus.distribution,
                }),
            ),
        ];
        widgets.extend(fundamentals_widgets(fundamentals.as_ref(), &symbol, lang));

        let generator = self.narrative_generator();
        let ctx = ReviewContext {
            symbol: &symbol,
            company_name: &company_name,
            profile: &market.profile,
            kpi: &kpi,
            consensus: &consensus,
            lang,
        };

        info!(generator = generator.name(), "Generating narrative content");
        let (sections, insights) =
            tokio::join!(generator.generate_sections(&ctx), generator.generate_insights(&ctx));

        if let Some(widget) = insight_widget(insights) {
            widgets.push(widget);
        }
        widgets.push(cta_widget(lang));

        info!(
            widgets = widgets.len(),
            sections = sections.len(),
            has_fundamentals = fundamentals.is_some(),
            "Review assembled"
        );

        Ok(ToolResult {
            schema_version: SCHEMA_VERSION.to_string(),
            tool_key: STOCK_REVIEW_TOOL_KEY.to_string(),
            lang,
            generated_at: Utc::now(),
            seo: build_seo(&company_name, &symbol, &self.config.site_base_url, lang),
            entity: Entity {
                entity_type: "stock".to_string(),
                id: symbol.clone(),
                name: Some(company_name),
                ticker: Some(symbol),
                exchange: Some(exchange),
                logo: market.profile.logo.filter(|logo| !logo.trim().is_empty()),
            },
            widgets,
            sections,
            disclaimer: disclaimer(lang).to_string(),
        })
    }
}

fn fundamentals_widgets(
    fundamentals: Option<&FundamentalsBundle>,
    symbol: &str,
    lang: Language,
) -> Vec<Widget> {
    let Some(bundle) = fundamentals else {
        let symbol = escape_html(symbol);
        let html_message = match lang {
            Language::Hebrew => {
                format!("<p>נתוני דוחות כספיים אינם זמינים עבור {symbol} מ-SEC/EDGAR.</p>")
            }
            Language::English => {
                format!("<p>Financial statement data is not available for {symbol} from SEC/EDGAR.</p>")
            }
        };
        return vec![Widget::new(
            "fundamentals_notice",
            WidgetBody::Notice(NoticeData {
                kind: NoticeKind::Info,
                html_message,
            }),
        )];
    };

    bundle
        .tables()
        .into_iter()
        .map(|table| {
            Widget::new(
                table.kind.widget_id(),
                WidgetBody::Table(table.to_table_data(lang)),
            )
        })
        .collect()
}

fn insight_widget(insights: Vec<Insight>) -> Option<Widget> {
    (!insights.is_empty()).then(|| {
        Widget::new(
            "insights",
            WidgetBody::InsightList(InsightListData { items: insights }),
        )
    })
}

fn cta_widget(lang: Language) -> Widget {
    let (message, label, disclosure) = match lang {
        Language::Hebrew => (
            "<p>רוצים להעמיק? בדקו את הכלים הנוספים שלנו</p>",
            "כל המניות",
            "<small>המידע אינו מהווה ייעוץ השקעות</small>",
        ),
        Language::English => (
            "<p>Want to dig deeper? Explore our other tools</p>",
            "All stocks",
            "<small>This information is not investment advice</small>",
        ),
    };

    Widget::new(
        "cta",
        WidgetBody::CtaBox(CtaBoxData {
            html_message: message.to_string(),
            buttons: vec![CtaButton {
                url: "/stocks/".to_string(),
                label: label.to_string(),
                style: ButtonStyle::Primary,
            }],
            html_disclosure: disclosure.to_string(),
        }),
    )
}

fn build_seo(company_name: &str, symbol: &str, site_base_url: &str, lang: Language) -> Seo {
    let (title, description) = match lang {
        Language::Hebrew => (
            format!("סקירת מניית {company_name} ({symbol}) | MSL"),
            format!(
                "ניתוח מקיף של מניית {company_name} ({symbol}) - נתונים פיננסיים, המלצות אנליסטים, דוחות ותובנות"
            ),
        ),
        Language::English => (
            format!("Stock review: {company_name} ({symbol}) | MSL"),
            format!(
                "In-depth analysis of {company_name} ({symbol}) stock: financial data, analyst recommendations, reports and insights"
            ),
        ),
    };

    Seo {
        title,
        description,
        canonical: format!(
            "{}/stocks/{}",
            site_base_url.trim_end_matches('/'),
            symbol.to_lowercase()
        ),
        robots: "index, follow".to_string(),
    }
}

fn disclaimer(lang: Language) -> &'static str {
    match lang {
        Language::Hebrew => {
            "המידע באתר הינו אינפורמטיבי בלבד ואינו מהווה ייעוץ השקעות, המלצה או הצעה לרכישה או מכירה של ניירות ערך. כל החלטת השקעה היא באחריות המשתמש בלבד."
        }
        Language::English => {
            "The information on this site is for general information only and does not constitute investment advice, a recommendation, or an offer to buy or sell securities. Every investment decision is the sole responsibility of the user."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_exchange() {
        assert_eq!(normalize_exchange("NASDAQ NMS - GLOBAL MARKET"), "NASDAQ");
        assert_eq!(normalize_exchange("nasdaq global select"), "NASDAQ");
        assert_eq!(normalize_exchange("NEW YORK STOCK EXCHANGE, INC."), "NYSE");
        assert_eq!(normalize_exchange("NYSE American"), "AMEX");
        assert_eq!(normalize_exchange("Tel Aviv Stock Exchange"), "TASE");
        assert_eq!(normalize_exchange("LSE-1"), "LSE");
        assert_eq!(normalize_exchange(""), "NASDAQ");
        assert_eq!(normalize_exchange("  123 "), "NASDAQ");
    }

    #[test]
    fn test_seo() {
        let seo = build_seo("Acme Corp", "ACME", "https://msl.org.il/", Language::Hebrew);
        assert_eq!(seo.title, "סקירת מניית Acme Corp (ACME) | MSL");
        assert_eq!(seo.canonical, "https://msl.org.il/stocks/acme");
        assert_eq!(seo.robots, "index, follow");

        let seo = build_seo("Acme Corp", "ACME", "https://example.org", Language::English);
        assert_eq!(seo.title, "Stock review: Acme Corp (ACME) | MSL");
    }

    #[test]
    fn test_missing_fundamentals_is_single_notice() {
        let widgets = fundamentals_widgets(None, "ACME", Language::English);
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].id, "fundamentals_notice");
        assert_eq!(widgets[0].kind(), "notice");
    }

    #[test]
    fn test_no_insights_no_widget() {
        assert!(insight_widget(Vec::new()).is_none());
    }

    #[test]
    fn test_cta_shape() {
        let json = serde_json::to_value(cta_widget(Language::Hebrew)).unwrap();
        assert_eq!(json["type"], "cta_box");
        assert_eq!(json["data"]["buttons"][0]["url"], "/stocks/");
        assert_eq!(json["data"]["buttons"][0]["style"], "primary");
    }

    #[tokio::test]
    async fn test_missing_key_is_misconfigured() {
        let service = StockReviewService::new(ReviewConfig::default()).unwrap();
        let err = service
            .generate_review("AAPL", Language::Hebrew, "req-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Misconfigured(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_blank_symbol_is_unknown() {
        let config = ReviewConfig::builder().finnhub_api_key("k").build().unwrap();
        let service = StockReviewService::new(config).unwrap();
        let err = service
            .generate_review("   ", Language::English, "req-2")
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::UnknownSymbol(_)));
    }

    #[tokio::test]
    async fn test_missing_key_wins_over_blank_symbol() {
        let service = StockReviewService::new(ReviewConfig::default()).unwrap();
        let err = service
            .generate_review("", Language::English, "req-3")
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Misconfigured(_)));
        assert_eq!(err.code(), crate::error::ErrorCode::Misconfigured);
    }
}
