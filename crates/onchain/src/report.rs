use core_types::{AnalysisWarning, ProviderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sub-score input that was absent and replaced by the neutral value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    pub group: String,
    pub field: String,
}

impl MissingField {
    pub fn path(&self) -> String {
        format!("{}.{}", self.group, self.field)
    }
}

/// The four onchain sub-scores, each in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnchainSubscores {
    pub blockchain: Decimal,
    pub defi: Decimal,
    pub cross_chain: Decimal,
    pub smart_contract: Decimal,
}

/// Network adoption inputs and their log-scaled indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockchainAdoption {
    pub tvl_usd: Option<Decimal>,
    /// Sum of the per-network daily transaction counts.
    pub daily_transactions: Option<Decimal>,
    pub network_transactions: BTreeMap<String, Decimal>,
    pub tvl_index: Decimal,
    pub transaction_index: Decimal,
    /// Mean of the TVL and transaction indices.
    pub adoption_index: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOnchain {
    pub market_name: String,
    pub provider_type: ProviderType,
    pub adoption: BlockchainAdoption,
    /// `1 - minmax(cost_per_transaction_usd)` across markets.
    pub gas_optimization: Option<Decimal>,
    pub subscores: OnchainSubscores,
    /// Weighted sub-scores on the 0-100 scale.
    pub onchain_score: Decimal,
    /// The market's offchain composite, when it was scored offchain.
    pub offchain_score: Option<Decimal>,
    /// Blend of the offchain and onchain scores; `None` without an offchain score.
    pub hybrid_score: Option<Decimal>,
    pub missing_fields: Vec<MissingField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnchainInsights {
    pub total_tvl_usd: Decimal,
    /// Mean of the positive average APYs, in percent.
    pub average_apy_pct: Option<Decimal>,
    pub daily_bridge_volume_usd: Decimal,
    pub daily_cross_chain_transfers: Decimal,
    pub findings: Vec<String>,
}

/// The answer to "how does onchain data change the picture?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnchainReport {
    /// Markets carrying onchain data, in input order.
    pub markets: Vec<MarketOnchain>,
    /// Networks whose daily transaction counts were read.
    pub networks: Vec<String>,
    pub average_onchain_score: Decimal,
    pub average_hybrid_score: Option<Decimal>,
    pub insights: OnchainInsights,
    pub warnings: Vec<AnalysisWarning>,
}

impl OnchainReport {
    pub fn market(&self, market_name: &str) -> Option<&MarketOnchain> {
        self.markets.iter().find(|m| m.market_name == market_name)
    }
}
