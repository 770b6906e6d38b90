//! Derived analytics: analyst consensus and filed fundamentals

pub mod consensus;
pub mod fundamentals;

pub use consensus::{
    AnalystConsensus, ConsensusLabel, Distribution, PriceTargets, score_consensus, upside_pct,
};
pub use fundamentals::{
    CompanyFacts, ExtractedSeries, FactRecord, FundamentalsBundle, Granularity, MetricRow,
    MetricTable, TableKind, TagFacts, derive_free_cash_flow, extract_metric, scale_value,
};

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(4.666_666, 2), 4.67);
        assert_eq!(round_to(-2.25, 1), -2.3);
        assert_eq!(round_to(394.328, 1), 394.3);
        assert_eq!(round_to(7.0, 0), 7.0);
    }
}
