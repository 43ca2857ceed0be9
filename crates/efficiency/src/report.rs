use crate::friction::FrictionAnalysis;
use core_types::{AnalysisWarning, Grade, ProviderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four efficiency dimensions of a market, each in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    /// Share of attempted transactions that succeeded.
    pub operational: Decimal,
    /// Float turnover, clipped and scaled across markets.
    pub financial: Decimal,
    /// Agent activity and coverage.
    pub network: Decimal,
    /// Transaction growth in excess of user growth.
    pub user: Decimal,
}

/// The efficiency picture of one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEfficiency {
    pub market_name: String,
    /// Position of the market's record in the analyzed input.
    pub record_index: usize,
    pub region: String,
    pub provider_type: ProviderType,

    // I. Raw indicators (percentages where noted)
    pub success_rate_pct: Option<Decimal>,
    pub failure_rate_pct: Option<Decimal>,
    /// `total_volume / average_float`, before clipping.
    pub float_turnover: Option<Decimal>,
    /// `attempted / average_float`.
    pub float_velocity: Option<Decimal>,
    pub agent_utilization_pct: Option<Decimal>,

    // II. Scores
    pub dimensions: DimensionScores,
    /// Weighted dimension sum on the 0-100 scale.
    pub composite_score: Decimal,
    pub grade: Grade,

    // III. Friction
    pub friction: FrictionAnalysis,

    /// Notes on every fallback or correction applied while scoring.
    pub annotations: Vec<String>,
}

/// Summary statistics across all scored markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEfficiency {
    pub mean_score: Decimal,
    pub min_score: Decimal,
    pub max_score: Decimal,
    pub best_market: String,
    pub worst_market: String,
    pub grade_distribution: BTreeMap<Grade, usize>,
}

/// Average indicators of the markets of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalEfficiency {
    pub markets: Vec<String>,
    pub average_success_rate_pct: Option<Decimal>,
    pub average_agent_utilization_pct: Option<Decimal>,
    pub average_float_turnover: Option<Decimal>,
    pub average_score: Decimal,
}

/// Differences `region_a - region_b` between two regions' averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalGap {
    pub region_a: String,
    pub region_b: String,
    pub success_rate_gap: Option<Decimal>,
    pub agent_utilization_gap: Option<Decimal>,
    pub float_turnover_gap: Option<Decimal>,
    pub score_gap: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyInsights {
    pub key_findings: Vec<String>,
    pub regional_patterns: Vec<String>,
    pub efficiency_drivers: Vec<String>,
}

impl EfficiencyInsights {
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.key_findings
            .iter()
            .chain(&self.regional_patterns)
            .chain(&self.efficiency_drivers)
    }
}

/// The answer to "how efficiently is liquidity used?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    /// Scored markets, in input order.
    pub markets: Vec<MarketEfficiency>,
    /// `None` when no market carried offchain data.
    pub aggregate: Option<AggregateEfficiency>,
    pub regional: BTreeMap<String, RegionalEfficiency>,
    pub disparities: Vec<RegionalGap>,
    pub insights: EfficiencyInsights,
    pub warnings: Vec<AnalysisWarning>,
}

impl EfficiencyReport {
    /// Creates a new, empty EfficiencyReport.
    pub fn new() -> Self {
        Self {
            markets: Vec::new(),
            aggregate: None,
            regional: BTreeMap::new(),
            disparities: Vec::new(),
            insights: EfficiencyInsights::default(),
            warnings: Vec::new(),
        }
    }

    pub fn market(&self, market_name: &str) -> Option<&MarketEfficiency> {
        self.markets.iter().find(|m| m.market_name == market_name)
    }

    /// The composite score of the record at `record_index`, if it was scored.
    /// Market names may repeat, positions do not.
    pub fn score_at(&self, record_index: usize) -> Option<Decimal> {
        self.markets
            .iter()
            .find(|m| m.record_index == record_index)
            .map(|m| m.composite_score)
    }
}

impl Default for EfficiencyReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_grade_distribution_serializes_with_grade_labels() {
        let aggregate = AggregateEfficiency {
            mean_score: dec!(82.5),
            min_score: dec!(75),
            max_score: dec!(90),
            best_market: "A".to_string(),
            worst_market: "B".to_string(),
            grade_distribution: BTreeMap::from([(Grade::A, 1), (Grade::BPlus, 1)]),
        };
        let value = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(value["grade_distribution"]["B+"], 1);
        assert_eq!(value["grade_distribution"]["A"], 1);
    }

    #[test]
    fn test_score_lookup_by_record_position() {
        let report = EfficiencyReport::new();
        assert_eq!(report.score_at(0), None);
    }
}
