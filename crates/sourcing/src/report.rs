use core_types::AnalysisWarning;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One liquidity source type and its share of a volume total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceShare {
    pub source_type: String,
    pub total_volume: Decimal,
    /// Share of the total in percent (0-100).
    pub percentage: Decimal,
}

/// The dominant liquidity source across all markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrimarySource {
    Identified {
        source_type: String,
        total_volume: Decimal,
        percentage: Decimal,
    },
    /// No source carries any volume, so no source can be called primary.
    InsufficientData,
}

impl PrimarySource {
    pub fn source_type(&self) -> Option<&str> {
        match self {
            PrimarySource::Identified { source_type, .. } => Some(source_type),
            PrimarySource::InsufficientData => None,
        }
    }
}

/// How the markets of one region source their liquidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalSourcing {
    pub markets: Vec<String>,
    pub total_volume: Decimal,
    pub top_source: Option<String>,
    /// `top source volume / region total`; `None` when the region total is zero.
    pub concentration: Option<Decimal>,
    /// Every source type used by at least one market of the region.
    pub common_sources: Vec<String>,
    pub average_volume_per_market: Option<Decimal>,
    pub distribution: Vec<SourceShare>,
}

/// The sourcing picture of a single market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSourcing {
    pub market_name: String,
    pub region: String,
    pub total_volume: Decimal,
    pub primary_source: Option<String>,
    pub distribution: Vec<SourceShare>,
}

/// Offchain liquidity volume next to onchain value locked and traded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelComparison {
    pub offchain_markets: Vec<String>,
    pub offchain_volume: Decimal,
    pub onchain_markets: Vec<String>,
    pub onchain_tvl: Decimal,
    pub onchain_daily_volume: Decimal,
    /// `onchain TVL / offchain volume`, when both sides are present.
    pub tvl_to_offchain_ratio: Option<Decimal>,
}

/// The answer to "where do providers source liquidity?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingReport {
    /// Source types ranked by volume, largest first; ties broken by name.
    pub ranked_sources: Vec<SourceShare>,
    pub grand_total: Decimal,
    pub primary_source: PrimarySource,
    pub regional: BTreeMap<String, RegionalSourcing>,
    pub markets: Vec<MarketSourcing>,
    pub channel_comparison: ChannelComparison,
    pub warnings: Vec<AnalysisWarning>,
}

impl SourcingReport {
    /// Creates an empty report before any record has been aggregated.
    pub fn new() -> Self {
        Self {
            ranked_sources: Vec::new(),
            grand_total: Decimal::ZERO,
            primary_source: PrimarySource::InsufficientData,
            regional: BTreeMap::new(),
            markets: Vec::new(),
            channel_comparison: ChannelComparison {
                offchain_markets: Vec::new(),
                offchain_volume: Decimal::ZERO,
                onchain_markets: Vec::new(),
                onchain_tvl: Decimal::ZERO,
                onchain_daily_volume: Decimal::ZERO,
                tvl_to_offchain_ratio: None,
            },
            warnings: Vec::new(),
        }
    }
}

impl Default for SourcingReport {
    fn default() -> Self {
        Self::new()
    }
}
