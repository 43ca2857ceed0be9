use crate::enums::ProviderType;
use crate::scale::saturating_sum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One market (or provider) under study, after normalization.
///
/// Identity fields are always present. Every metric is optional: a value that was
/// missing from the input, or that failed numeric extraction, is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    // --- Identity ---
    pub market_name: String,
    pub country: String,
    pub region: String,
    pub provider_type: ProviderType,

    // --- Offchain metrics ---
    /// Source type (e.g. "commercial_bank", "agent_network") to volume.
    pub liquidity_sources: BTreeMap<String, Decimal>,
    pub transaction_metrics: TransactionMetrics,
    pub float_metrics: FloatMetrics,
    pub agent_network: AgentNetwork,
    pub growth_metrics: GrowthMetrics,
    /// Where the figures come from; drives the reliability part of the quality score.
    pub data_source: Option<String>,

    // --- Onchain metrics ---
    pub onchain: Option<OnchainSection>,

    // --- Derived metadata ---
    pub quality: QualityAssessment,
    /// Raw text kept alongside every value that went through cleaning.
    pub provenance: BTreeMap<String, FieldProvenance>,
    pub outliers: Vec<OutlierFlag>,
    pub annotations: Vec<String>,
}

impl MarketRecord {
    /// A record with identity only and every metric missing.
    pub fn new(
        market_name: impl Into<String>,
        country: impl Into<String>,
        region: impl Into<String>,
        provider_type: ProviderType,
    ) -> Self {
        Self {
            market_name: market_name.into(),
            country: country.into(),
            region: region.into(),
            provider_type,
            liquidity_sources: BTreeMap::new(),
            transaction_metrics: TransactionMetrics::default(),
            float_metrics: FloatMetrics::default(),
            agent_network: AgentNetwork::default(),
            growth_metrics: GrowthMetrics::default(),
            data_source: None,
            onchain: None,
            quality: QualityAssessment::default(),
            provenance: BTreeMap::new(),
            outliers: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Total volume across all liquidity sources of this market, saturating at
    /// `Decimal::MAX`.
    pub fn total_liquidity(&self) -> Decimal {
        saturating_sum(self.liquidity_sources.values().copied())
    }

    pub fn has_onchain(&self) -> bool {
        self.onchain.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetrics {
    pub attempted: Option<u64>,
    pub successful: Option<u64>,
    pub failed: Option<u64>,
}

impl TransactionMetrics {
    /// Checks `successful + failed <= attempted`. Returns `None` when a count is missing.
    pub fn is_consistent(&self) -> Option<bool> {
        match (self.attempted, self.successful, self.failed) {
            (Some(attempted), Some(successful), Some(failed)) => {
                Some(successful.saturating_add(failed) <= attempted)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatMetrics {
    pub total_volume: Option<Decimal>,
    pub average_float: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentNetwork {
    pub total: Option<u64>,
    pub active: Option<u64>,
    pub with_liquidity: Option<u64>,
    pub with_cash: Option<u64>,
}

impl AgentNetwork {
    /// Checks that each sub-count is bounded by `total`, one entry per sub-count present.
    pub fn bound_checks(&self) -> Vec<(&'static str, bool)> {
        let Some(total) = self.total else {
            return Vec::new();
        };
        [
            ("active", self.active),
            ("with_liquidity", self.with_liquidity),
            ("with_cash", self.with_cash),
        ]
        .into_iter()
        .filter_map(|(name, count)| count.map(|c| (name, c <= total)))
        .collect()
    }
}

/// Growth rates as fractions (0.25 means 25% period-over-period growth).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub transaction_growth_rate: Option<Decimal>,
    pub user_growth_rate: Option<Decimal>,
}

/// The four blockchain/DeFi metric groups. Each is a bag of named numeric fields
/// because the set of networks, bridges and protocols is data-driven.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnchainSection {
    pub blockchain_metrics: BTreeMap<String, Decimal>,
    pub defi_integration: BTreeMap<String, Decimal>,
    pub cross_chain_efficiency: BTreeMap<String, Decimal>,
    pub smart_contract_performance: BTreeMap<String, Decimal>,
}

/// The per-record data quality score and the components it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Final score in [0, 1].
    pub score: Decimal,
    pub completeness: Decimal,
    pub consistency: Decimal,
    pub source_reliability: Decimal,
    /// Total deducted for soft parse issues.
    pub penalty: Decimal,
}

impl Default for QualityAssessment {
    fn default() -> Self {
        Self {
            score: Decimal::ZERO,
            completeness: Decimal::ZERO,
            consistency: Decimal::ONE,
            source_reliability: Decimal::ZERO,
            penalty: Decimal::ZERO,
        }
    }
}

/// What a textual value looked like before and after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub raw: String,
    pub cleaned: Option<Decimal>,
    pub unit: Option<String>,
    pub multiplier: Decimal,
}

/// A value far above the cross-market median for the same field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFlag {
    pub field: String,
    pub value: Decimal,
    pub median: Decimal,
    /// `value / median`.
    pub ratio: Decimal,
}
