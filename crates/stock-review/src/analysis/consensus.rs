//! Analyst consensus engine

use super::round_to;
use crate::api::{PriceTarget, RecommendationSnapshot};
use crate::locale::Language;
use serde::{Deserialize, Serialize};

/// Recommendation counts of the latest period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub strong_buy: u32,
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
    pub strong_sell: u32,
}

impl Distribution {
    /// Take the newest snapshot; the provider lists periods newest first
    pub fn latest(snapshots: &[RecommendationSnapshot]) -> Self {
        snapshots.first().map(Self::from).unwrap_or_default()
    }

    pub fn total(&self) -> u32 {
        self.strong_buy + self.buy + self.hold + self.sell + self.strong_sell
    }

    /// Weighted average on a 1..=5 scale, absent without analysts
    pub fn weighted_score(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        let weighted = self.strong_buy * 5 + self.buy * 4 + self.hold * 3 + self.sell * 2
            + self.strong_sell;
        Some(f64::from(weighted) / f64::from(total))
    }
}

impl From<&RecommendationSnapshot> for Distribution {
    fn from(snapshot: &RecommendationSnapshot) -> Self {
        Self {
            strong_buy: snapshot.strong_buy,
            buy: snapshot.buy,
            hold: snapshot.hold,
            sell: snapshot.sell,
            strong_sell: snapshot.strong_sell,
        }
    }
}

/// Price-target set shown on the analyst card
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTargets {
    pub consensus: Option<f64>,
    pub median: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl PriceTargets {
    /// Only a non-zero mean target makes the set meaningful
    pub fn from_price_target(target: &PriceTarget) -> Self {
        match target.target_mean {
            Some(mean) if mean != 0.0 => Self {
                consensus: Some(mean),
                median: target.target_median,
                high: target.target_high,
                low: target.target_low,
            },
            _ => Self::default(),
        }
    }
}

/// Consensus label bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusLabel {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl ConsensusLabel {
    /// Band boundaries sit exactly at 4.5, 3.5, 2.5 and 1.5
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            ConsensusLabel::StrongBuy
        } else if score >= 3.5 {
            ConsensusLabel::Buy
        } else if score >= 2.5 {
            ConsensusLabel::Hold
        } else if score >= 1.5 {
            ConsensusLabel::Sell
        } else {
            ConsensusLabel::StrongSell
        }
    }

    pub fn text(self, lang: Language) -> &'static str {
        match (lang, self) {
            (Language::Hebrew, ConsensusLabel::StrongBuy) => "קנייה חזקה",
            (Language::Hebrew, ConsensusLabel::Buy) => "קנייה",
            (Language::Hebrew, ConsensusLabel::Hold) => "החזקה",
            (Language::Hebrew, ConsensusLabel::Sell) => "מכירה",
            (Language::Hebrew, ConsensusLabel::StrongSell) => "מכירה חזקה",
            (Language::English, ConsensusLabel::StrongBuy) => "Strong Buy",
            (Language::English, ConsensusLabel::Buy) => "Buy",
            (Language::English, ConsensusLabel::Hold) => "Hold",
            (Language::English, ConsensusLabel::Sell) => "Sell",
            (Language::English, ConsensusLabel::StrongSell) => "Strong Sell",
        }
    }
}

/// Derived analyst view of one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct AnalystConsensus {
    /// Rounded to two decimals
    pub score: Option<f64>,
    /// Derived from the unrounded score
    pub label: Option<ConsensusLabel>,
    pub analysts_count: u32,
    pub distribution: Distribution,
    pub targets: PriceTargets,
    /// Unrounded percentage
    pub upside_pct: Option<f64>,
}

/// Score a recommendation distribution against the current price
pub fn score_consensus(
    distribution: Distribution,
    targets: PriceTargets,
    price: f64,
) -> AnalystConsensus {
    let raw = distribution.weighted_score();

    AnalystConsensus {
        score: raw.map(|s| round_to(s, 2)),
        label: raw.map(ConsensusLabel::from_score),
        analysts_count: distribution.total(),
        distribution,
        targets,
        upside_pct: upside_pct(targets.consensus, price),
    }
}

/// Percentage from `price` to the consensus target
pub fn upside_pct(consensus: Option<f64>, price: f64) -> Option<f64> {
    match consensus {
        Some(target) if target != 0.0 && price > 0.0 => Some((target - price) * 100.0 / price),
        _ => None,
    }
}
