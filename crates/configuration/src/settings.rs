use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance used when checking that a set of weights sums to one.
const WEIGHT_TOLERANCE: Decimal = dec!(0.001);

/// The root configuration structure for a research run.
///
/// Every section (and every field inside it) falls back to its documented default, so a
/// `research.toml` only needs to name what it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub normalizer: NormalizerConfig,
    pub efficiency: EfficiencyConfig,
    pub onchain: OnchainConfig,
}

impl ResearchConfig {
    /// Checks that weights, thresholds and ratios are logical.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalizer.validate()?;
        self.efficiency.validate()?;
        self.onchain.validate()?;
        Ok(())
    }
}

// ==============================================================================
// Normalizer
// ==============================================================================

/// Cleaning, quality-scoring and outlier rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// A value above `outlier_multiplier` x the cross-market median is flagged.
    pub outlier_multiplier: Decimal,
    /// Deducted from the quality score for every soft parse issue.
    pub parse_penalty: Decimal,
    pub quality_weights: QualityWeights,
    /// Reliability assumed for a source missing from `source_reliability`.
    pub default_source_reliability: Decimal,
    /// Known data sources (lowercase, spaces as underscores) to reliability in [0, 1].
    pub source_reliability: BTreeMap<String, Decimal>,
    /// Unit suffix (lowercase) to multiplier.
    pub unit_multipliers: BTreeMap<String, Decimal>,
}

/// Weights for the three components of the quality score. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub completeness: Decimal,
    pub consistency: Decimal,
    pub source_reliability: Decimal,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let source_reliability = [
            ("central_bank", dec!(0.95)),
            ("regulator", dec!(0.9)),
            ("gsma", dec!(0.9)),
            ("world_bank", dec!(0.9)),
            ("imf", dec!(0.9)),
            ("operator_report", dec!(0.85)),
            ("etherscan", dec!(0.85)),
            ("celo_explorer", dec!(0.8)),
            ("dune_analytics", dec!(0.8)),
            ("the_graph", dec!(0.8)),
            ("defillama", dec!(0.8)),
            ("press_release", dec!(0.6)),
            ("survey", dec!(0.6)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let unit_multipliers = [
            ("trillion", dec!(1000000000000)),
            ("tn", dec!(1000000000000)),
            ("billion", dec!(1000000000)),
            ("bn", dec!(1000000000)),
            ("b", dec!(1000000000)),
            ("million", dec!(1000000)),
            ("mn", dec!(1000000)),
            ("m", dec!(1000000)),
            ("thousand", dec!(1000)),
            ("k", dec!(1000)),
            ("%", dec!(0.01)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            outlier_multiplier: dec!(5),
            parse_penalty: dec!(0.05),
            quality_weights: QualityWeights::default(),
            default_source_reliability: dec!(0.7),
            source_reliability,
            unit_multipliers,
        }
    }
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            completeness: dec!(0.40),
            consistency: dec!(0.35),
            source_reliability: dec!(0.25),
        }
    }
}

impl NormalizerConfig {
    /// Reliability of a named data source, `default_source_reliability` if unknown.
    pub fn reliability_of(&self, source: Option<&str>) -> Decimal {
        source
            .map(|s| s.trim().to_lowercase().replace([' ', '-'], "_"))
            .and_then(|key| self.source_reliability.get(&key).copied())
            .unwrap_or(self.default_source_reliability)
    }

    /// Multiplier for a unit suffix, `None` if the unit is unknown.
    pub fn multiplier_for(&self, unit: &str) -> Option<Decimal> {
        self.unit_multipliers.get(&unit.to_lowercase()).copied()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.outlier_multiplier <= Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "normalizer.outlier_multiplier must be greater than 1".to_string(),
            ));
        }
        ensure_unit_range("normalizer.parse_penalty", self.parse_penalty)?;
        ensure_unit_range(
            "normalizer.default_source_reliability",
            self.default_source_reliability,
        )?;
        for (source, reliability) in &self.source_reliability {
            ensure_unit_range(&format!("normalizer.source_reliability.{source}"), *reliability)?;
        }
        let w = &self.quality_weights;
        ensure_sums_to_one(
            "normalizer.quality_weights",
            &[w.completeness, w.consistency, w.source_reliability],
        )
    }
}

// ==============================================================================
// Efficiency
// ==============================================================================

/// Scoring rules for the offchain efficiency analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyConfig {
    pub weights: DimensionWeights,
    pub grade_thresholds: GradeThresholds,
    pub friction: FrictionThresholds,
    /// Float turnover is clipped to `[0, turnover_cap]` before scaling.
    pub turnover_cap: Decimal,
    /// User dimension used when growth rates are missing.
    pub user_fallback: Decimal,
    /// Success-rate gap (percentage points) between two regions worth reporting.
    pub regional_gap_threshold: Decimal,
}

/// Weights for the four efficiency dimensions. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    pub operational: Decimal,
    pub financial: Decimal,
    pub network: Decimal,
    pub user: Decimal,
}

/// Lower bound (inclusive) of each grade band on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeThresholds {
    pub a: Decimal,
    pub b_plus: Decimal,
    pub b: Decimal,
    pub b_minus: Decimal,
    pub c: Decimal,
}

/// An agent subgroup below these coverage ratios is flagged as a friction point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrictionThresholds {
    /// `with_liquidity / active` below this is a cash-out risk.
    pub cash_out: Decimal,
    /// `with_cash / active` below this is a cash-in risk.
    pub cash_in: Decimal,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            weights: DimensionWeights::default(),
            grade_thresholds: GradeThresholds::default(),
            friction: FrictionThresholds::default(),
            turnover_cap: dec!(20),
            user_fallback: dec!(0.5),
            regional_gap_threshold: dec!(5),
        }
    }
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            operational: dec!(0.30),
            financial: dec!(0.25),
            network: dec!(0.25),
            user: dec!(0.20),
        }
    }
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: dec!(90),
            b_plus: dec!(80),
            b: dec!(70),
            b_minus: dec!(60),
            c: dec!(50),
        }
    }
}

impl Default for FrictionThresholds {
    fn default() -> Self {
        Self {
            cash_out: dec!(0.5),
            cash_in: dec!(0.5),
        }
    }
}

impl EfficiencyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        ensure_sums_to_one(
            "efficiency.weights",
            &[w.operational, w.financial, w.network, w.user],
        )?;

        let g = &self.grade_thresholds;
        let bands = [g.a, g.b_plus, g.b, g.b_minus, g.c];
        if bands.windows(2).any(|pair| pair[0] <= pair[1]) {
            return Err(ConfigError::ValidationError(
                "efficiency.grade_thresholds must be strictly descending from a to c".to_string(),
            ));
        }
        if g.a > dec!(100) || g.c <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "efficiency.grade_thresholds must lie within (0, 100]".to_string(),
            ));
        }

        ensure_unit_range("efficiency.friction.cash_out", self.friction.cash_out)?;
        ensure_unit_range("efficiency.friction.cash_in", self.friction.cash_in)?;
        ensure_unit_range("efficiency.user_fallback", self.user_fallback)?;
        ensure_positive("efficiency.turnover_cap", self.turnover_cap)
    }
}

// ==============================================================================
// Onchain
// ==============================================================================

/// Scoring rules for the blockchain/DeFi analysis and the hybrid blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnchainConfig {
    /// Share of the offchain score in the hybrid score; the onchain share is the rest.
    pub offchain_blend_weight: Decimal,
    /// Networks whose `<network>_daily_tx` counts are always read. Networks found in
    /// the data are added to this list.
    pub networks: Vec<String>,
    /// APY (in percent) at which the DeFi reward saturates.
    pub apy_cap: Decimal,
    pub latency_penalty: Decimal,
    pub reference_latency_secs: Decimal,
    pub cost_penalty: Decimal,
    pub reference_cost_usd: Decimal,
    pub execution_weight: Decimal,
    pub gas_weight: Decimal,
    pub subscore_weights: SubscoreWeights,
    /// Neutral value a missing sub-field contributes.
    pub missing_field_value: Decimal,
}

/// Weights of the four onchain sub-scores in the onchain composite. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscoreWeights {
    pub blockchain: Decimal,
    pub defi: Decimal,
    pub cross_chain: Decimal,
    pub smart_contract: Decimal,
}

impl Default for OnchainConfig {
    fn default() -> Self {
        Self {
            offchain_blend_weight: dec!(0.7),
            networks: ["celo", "stellar", "ethereum", "polygon"]
                .into_iter()
                .map(String::from)
                .collect(),
            apy_cap: dec!(15),
            latency_penalty: dec!(0.1),
            reference_latency_secs: dec!(600),
            cost_penalty: dec!(0.1),
            reference_cost_usd: dec!(10),
            execution_weight: dec!(0.6),
            gas_weight: dec!(0.4),
            subscore_weights: SubscoreWeights::default(),
            missing_field_value: dec!(0.5),
        }
    }
}

impl Default for SubscoreWeights {
    fn default() -> Self {
        Self {
            blockchain: dec!(0.25),
            defi: dec!(0.25),
            cross_chain: dec!(0.25),
            smart_contract: dec!(0.25),
        }
    }
}

impl OnchainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_unit_range("onchain.offchain_blend_weight", self.offchain_blend_weight)?;
        ensure_unit_range("onchain.latency_penalty", self.latency_penalty)?;
        ensure_unit_range("onchain.cost_penalty", self.cost_penalty)?;
        ensure_unit_range("onchain.missing_field_value", self.missing_field_value)?;
        if self.latency_penalty + self.cost_penalty > Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "onchain.latency_penalty + onchain.cost_penalty must not exceed 1".to_string(),
            ));
        }
        ensure_positive("onchain.apy_cap", self.apy_cap)?;
        ensure_positive("onchain.reference_latency_secs", self.reference_latency_secs)?;
        ensure_positive("onchain.reference_cost_usd", self.reference_cost_usd)?;
        ensure_sums_to_one(
            "onchain.execution_weight + onchain.gas_weight",
            &[self.execution_weight, self.gas_weight],
        )?;
        let w = &self.subscore_weights;
        ensure_sums_to_one(
            "onchain.subscore_weights",
            &[w.blockchain, w.defi, w.cross_chain, w.smart_contract],
        )
    }
}

// --- Validation helpers ---

fn ensure_sums_to_one(name: &str, weights: &[Decimal]) -> Result<(), ConfigError> {
    if weights.iter().any(|w| w.is_sign_negative()) {
        return Err(ConfigError::ValidationError(format!(
            "{name} must not contain negative weights"
        )));
    }
    let total = weights
        .iter()
        .fold(Decimal::ZERO, |sum, w| sum.saturating_add(*w));
    if (total - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
        return Err(ConfigError::ValidationError(format!(
            "{name} must sum to 1.0 (got {total})"
        )));
    }
    Ok(())
}

fn ensure_unit_range(name: &str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be between 0 and 1 (got {value})"
        )));
    }
    Ok(())
}

fn ensure_positive(name: &str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be greater than 0 (got {value})"
        )));
    }
    Ok(())
}
