//! Heuristic insights derived from the computed figures
//!
//! Pure and offline: three independent rules evaluated in a fixed order.

use super::ReviewContext;
use crate::locale::Language;
use serde::{Deserialize, Serialize};

const POSITIVE_SCORE: f64 = 4.0;
const NEGATIVE_SCORE: f64 = 2.5;
const UPSIDE_HIGH: f64 = 20.0;
const UPSIDE_LOW: f64 = -10.0;
const MOVE_MEDIUM: f64 = 5.0;
const MOVE_HIGH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One item of the insight list widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub severity: Severity,
    pub title: String,
    #[serde(rename = "why")]
    pub rationale: String,
    #[serde(rename = "what_to_do")]
    pub action: String,
    pub evidence: Option<String>,
}

impl Insight {
    fn new(
        severity: Severity,
        title: impl Into<String>,
        rationale: impl Into<String>,
        action: impl Into<String>,
        evidence: Option<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            rationale: rationale.into(),
            action: action.into(),
            evidence,
        }
    }
}

/// Evaluate consensus, target and daily-move rules
pub fn heuristic_insights(ctx: &ReviewContext<'_>) -> Vec<Insight> {
    [
        consensus_insight(ctx),
        target_insight(ctx),
        daily_move_insight(ctx),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn consensus_insight(ctx: &ReviewContext<'_>) -> Option<Insight> {
    let score = ctx.consensus.score?;
    let count = ctx.consensus.analysts_count;
    let evidence = ctx.consensus.label.map(|l| l.text(ctx.lang).to_string());

    let rationale = match ctx.lang {
        Language::Hebrew => format!("דירוג ממוצע של {score}/5 מצד {count} אנליסטים"),
        Language::English => format!("Average rating of {score}/5 from {count} analysts"),
    };

    if score >= POSITIVE_SCORE {
        let (title, action) = match ctx.lang {
            Language::Hebrew => ("קונצנזוס אנליסטים חיובי", "שווה לבחון את הסיבות לאופטימיות"),
            Language::English => (
                "Positive analyst consensus",
                "Worth examining the reasons for the optimism",
            ),
        };
        Some(Insight::new(Severity::Low, title, rationale, action, evidence))
    } else if score <= NEGATIVE_SCORE {
        let (title, action) = match ctx.lang {
            Language::Hebrew => ("קונצנזוס אנליסטים שלילי", "חשוב להבין את הסיבות לפסימיות"),
            Language::English => (
                "Negative analyst consensus",
                "Understand the reasons behind the pessimism",
            ),
        };
        Some(Insight::new(Severity::High, title, rationale, action, evidence))
    } else {
        None
    }
}

fn target_insight(ctx: &ReviewContext<'_>) -> Option<Insight> {
    let upside = ctx.consensus.upside_pct?;
    let consensus = ctx.consensus.targets.consensus?;

    if upside > UPSIDE_HIGH {
        let range = match (ctx.consensus.targets.low, ctx.consensus.targets.high) {
            (Some(low), Some(high)) => Some(match ctx.lang {
                Language::Hebrew => format!("טווח יעדים: ${low:.2} - ${high:.2}"),
                Language::English => format!("Target range: ${low:.2} - ${high:.2}"),
            }),
            _ => None,
        };
        let (title, rationale, action) = match ctx.lang {
            Language::Hebrew => (
                "פוטנציאל עלייה משמעותי",
                format!("מחיר יעד קונצנזוס: ${consensus:.2}, {upside:.0}% מעל המחיר הנוכחי"),
                "בדוק את ההנחות מאחורי מחירי היעד",
            ),
            Language::English => (
                "Significant upside potential",
                format!("Consensus target ${consensus:.2}, {upside:.0}% above the current price"),
                "Check the assumptions behind the price targets",
            ),
        };
        Some(Insight::new(Severity::Low, title, rationale, action, range))
    } else if upside < UPSIDE_LOW {
        let downside = upside.abs();
        let (title, rationale, action) = match ctx.lang {
            Language::Hebrew => (
                "מחיר מעל יעד האנליסטים",
                format!("מחיר יעד קונצנזוס: ${consensus:.2}, {downside:.0}% מתחת למחיר הנוכחי"),
                "המניה עשויה להיות במחיר גבוה יחסית להערכות",
            ),
            Language::English => (
                "Price above analyst targets",
                format!("Consensus target ${consensus:.2}, {downside:.0}% below the current price"),
                "The stock may be priced high relative to estimates",
            ),
        };
        Some(Insight::new(Severity::High, title, rationale, action, None))
    } else {
        None
    }
}

fn daily_move_insight(ctx: &ReviewContext<'_>) -> Option<Insight> {
    let change = ctx.kpi.day_change_pct?;
    let magnitude = change.abs();
    if magnitude <= MOVE_MEDIUM {
        return None;
    }

    let severity = if magnitude > MOVE_HIGH {
        Severity::High
    } else {
        Severity::Medium
    };

    let (title, rationale, action) = match (ctx.lang, change > 0.0) {
        (Language::Hebrew, rising) => (
            format!("{} משמעותית היום", if rising { "עלייה" } else { "ירידה" }),
            format!("המניה זזה {magnitude:.1}% היום"),
            "בדוק אם יש חדשות או אירוע שהשפיע",
        ),
        (Language::English, rising) => (
            format!("Significant {} today", if rising { "rise" } else { "drop" }),
            format!("The stock moved {magnitude:.1}% today"),
            "Check for news or an event behind the move",
        ),
    };

    Some(Insight::new(severity, title, rationale, action, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Distribution, PriceTargets, score_consensus};
    use crate::api::CompanyProfile;
    use crate::schema::KpiData;

    fn insights_for(
        distribution: Distribution,
        targets: PriceTargets,
        price: f64,
        day_change_pct: Option<f64>,
    ) -> Vec<Insight> {
        let consensus = score_consensus(distribution, targets, price);
        let kpi = KpiData {
            price,
            day_change_pct,
            ..KpiData::default()
        };
        let profile = CompanyProfile::default();
        let ctx = ReviewContext {
            symbol: "ACME",
            company_name: "Acme Corp",
            profile: &profile,
            kpi: &kpi,
            consensus: &consensus,
            lang: Language::English,
        };
        heuristic_insights(&ctx)
    }

    fn target(consensus: f64) -> PriceTargets {
        PriceTargets {
            consensus: Some(consensus),
            median: None,
            high: Some(consensus + 10.0),
            low: Some(consensus - 10.0),
        }
    }

    #[test]
    fn test_upside_threshold_is_strict() {
        let at_threshold = insights_for(Distribution::default(), target(120.0), 100.0, None);
        assert!(at_threshold.is_empty());

        let above = insights_for(Distribution::default(), target(125.0), 100.0, None);
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].severity, Severity::Low);
        assert_eq!(above[0].title, "Significant upside potential");
        assert_eq!(above[0].evidence.as_deref(), Some("Target range: $115.00 - $135.00"));
    }

    #[test]
    fn test_downside_is_high_severity() {
        let insights = insights_for(Distribution::default(), target(85.0), 100.0, None);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].severity, Severity::High);
        assert!(insights[0].evidence.is_none());
    }

    #[test]
    fn test_daily_move_severity() {
        let medium = insights_for(Distribution::default(), PriceTargets::default(), 10.0, Some(6.0));
        assert_eq!(medium[0].severity, Severity::Medium);
        assert_eq!(medium[0].title, "Significant rise today");

        let high = insights_for(Distribution::default(), PriceTargets::default(), 10.0, Some(-12.0));
        assert_eq!(high[0].severity, Severity::High);
        assert_eq!(high[0].rationale, "The stock moved 12.0% today");

        let quiet = insights_for(Distribution::default(), PriceTargets::default(), 10.0, Some(5.0));
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_consensus_rules_and_order() {
        let bullish = Distribution {
            strong_buy: 2,
            buy: 1,
            ..Distribution::default()
        };
        let insights = insights_for(bullish, target(125.0), 100.0, Some(-12.0));

        let severities: Vec<Severity> = insights.iter().map(|i| i.severity).collect();
        assert_eq!(severities, vec![Severity::Low, Severity::Low, Severity::High]);
        assert_eq!(insights[0].evidence.as_deref(), Some("Strong Buy"));

        let bearish = Distribution {
            sell: 2,
            strong_sell: 1,
            ..Distribution::default()
        };
        let insights = insights_for(bearish, PriceTargets::default(), 100.0, None);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].severity, Severity::High);

        let neutral = Distribution {
            hold: 3,
            ..Distribution::default()
        };
        assert!(insights_for(neutral, PriceTargets::default(), 100.0, None).is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let insights = insights_for(Distribution::default(), target(85.0), 100.0, None);
        let json = serde_json::to_value(&insights[0]).unwrap();
        assert_eq!(json["severity"], "high");
        assert!(json.get("why").is_some());
        assert!(json.get("what_to_do").is_some());
        assert!(json["evidence"].is_null());
    }
}
