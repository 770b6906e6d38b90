//! Content generation tier
//!
//! Narrative sections come from the first configured provider in
//! [`NarrativeBackend::PRIORITY`]; with none configured a static single-section
//! fallback is used and no insights are produced. Provider failures never fail
//! a review, they degrade to a minimal section naming the company.

pub mod insights;
pub mod llm;
pub mod prompts;

pub use insights::{Insight, Severity, heuristic_insights};
pub use llm::{LlmNarrativeGenerator, NarrativeBackend, extract_json_payload, parse_sections};

use crate::analysis::AnalystConsensus;
use crate::api::CompanyProfile;
use crate::config::ReviewConfig;
use crate::locale::{Language, escape_html};
use crate::schema::{KpiData, Section};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a generator may draw on
#[derive(Debug, Clone, Copy)]
pub struct ReviewContext<'a> {
    pub symbol: &'a str,
    pub company_name: &'a str,
    pub profile: &'a CompanyProfile,
    pub kpi: &'a KpiData,
    pub consensus: &'a AnalystConsensus,
    pub lang: Language,
}

/// A narrative generation strategy
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Ordered content sections; never empty, never an error
    async fn generate_sections(&self, ctx: &ReviewContext<'_>) -> Vec<Section>;

    async fn generate_insights(&self, ctx: &ReviewContext<'_>) -> Vec<Insight> {
        heuristic_insights(ctx)
    }
}

/// Used when no provider is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticNarrative;

#[async_trait]
impl NarrativeGenerator for StaticNarrative {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate_sections(&self, ctx: &ReviewContext<'_>) -> Vec<Section> {
        let name = escape_html(ctx.company_name);
        let symbol = escape_html(ctx.symbol);

        let (title, html) = match ctx.lang {
            Language::Hebrew => (
                "סקירה כללית",
                format!("<p>סקירה עבור {name} ({symbol}). תוכן מפורט יופיע כאן לאחר הגדרת ספק תוכן.</p>"),
            ),
            Language::English => (
                "Overview",
                format!(
                    "<p>Review of {name} ({symbol}). Detailed content appears here once a content provider is configured.</p>"
                ),
            ),
        };

        vec![Section::new("overview", title, html)]
    }

    async fn generate_insights(&self, _ctx: &ReviewContext<'_>) -> Vec<Insight> {
        Vec::new()
    }
}

/// Minimal section returned when a provider fails
pub fn fallback_sections(ctx: &ReviewContext<'_>) -> Vec<Section> {
    let name = escape_html(ctx.company_name);
    let symbol = escape_html(ctx.symbol);

    let (title, html) = match ctx.lang {
        Language::Hebrew => (
            "סקירה כללית",
            format!("<p>סקירה עבור {name} ({symbol}). התוכן המפורט יתעדכן בקרוב.</p>"),
        ),
        Language::English => (
            "Overview",
            format!("<p>Review of {name} ({symbol}). Detailed content will be updated soon.</p>"),
        ),
    };

    vec![Section::new("tl_dr", title, html)]
}

/// Resolve the generator chain for one request
pub fn select_generator(config: &ReviewConfig) -> Arc<dyn NarrativeGenerator> {
    for backend in NarrativeBackend::PRIORITY {
        match backend.build(config) {
            Some(Ok(generator)) => {
                info!(backend = ?backend, model = generator.model(), "Using narrative provider");
                return Arc::new(generator);
            }
            Some(Err(e)) => warn!(backend = ?backend, error = %e, "Narrative provider unavailable"),
            None => {}
        }
    }

    info!("No narrative provider configured, using static content");
    Arc::new(StaticNarrative)
}
