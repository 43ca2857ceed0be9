//! The four onchain sub-scores and the cross-market scalers they rely on.

use crate::report::MissingField;
use configuration::OnchainConfig;
use core_types::AnalysisWarning;
use core_types::scale::{
    as_fraction, clamp_unit, find_min_max, log_scale, mean, min_max_scale, ratio, saturating_sum,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub const TVL_KEY: &str = "tvl_usd";
pub const DAILY_TX_SUFFIX: &str = "_daily_tx";
pub const APY_KEY: &str = "average_apy_percentage";
pub const RISK_KEY: &str = "smart_contract_risk_score";
pub const EXECUTION_KEY: &str = "execution_success_rate";
pub const COST_KEY: &str = "cost_per_transaction_usd";
pub const BRIDGE_VOLUME_KEY: &str = "daily_bridge_volume_usd";
pub const TRANSFERS_KEY: &str = "cross_chain_transfers";

/// Records the inputs of one market that had to be replaced by the neutral value.
pub struct Fallbacks<'a> {
    market: &'a str,
    neutral: Decimal,
    pub missing: Vec<MissingField>,
    pub warnings: Vec<AnalysisWarning>,
}

impl<'a> Fallbacks<'a> {
    pub fn new(market: &'a str, neutral: Decimal) -> Self {
        Self {
            market,
            neutral,
            missing: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Flags `group.field` as missing and returns the neutral value.
    pub fn substitute(&mut self, group: &str, field: &str) -> Decimal {
        let missing = MissingField {
            group: group.to_string(),
            field: field.to_string(),
        };
        self.warnings.push(AnalysisWarning::Fallback {
            market: self.market.to_string(),
            field: missing.path(),
            substitute: self.neutral,
        });
        self.missing.push(missing);
        self.neutral
    }
}

/// Min-max scaling over `ln(1 + x)`, so a single very large network does not flatten
/// everyone else to zero.
#[derive(Debug, Clone, Copy)]
pub struct LogScaler {
    bounds: Option<(Decimal, Decimal)>,
}

impl LogScaler {
    pub fn new(values: impl IntoIterator<Item = Decimal>) -> Self {
        Self {
            bounds: find_min_max(values.into_iter().map(log_scale)),
        }
    }

    /// With a degenerate range any positive value scores 1.
    pub fn index(&self, raw: Decimal) -> Decimal {
        let Some((min, max)) = self.bounds else {
            return Decimal::ZERO;
        };
        min_max_scale(log_scale(raw), min, max).unwrap_or(if raw > Decimal::ZERO {
            Decimal::ONE
        } else {
            Decimal::ZERO
        })
    }
}

/// `value / reference` floored at 0 and capped at 1, also when the division overflows.
fn capped_ratio(value: Decimal, reference: Decimal) -> Decimal {
    ratio(value.max(Decimal::ZERO), reference).map_or(Decimal::ONE, |r| r.min(Decimal::ONE))
}

/// Values of every key ending in `suffix`.
fn with_suffix<'m>(
    fields: &'m BTreeMap<String, Decimal>,
    suffix: &'m str,
) -> impl Iterator<Item = Decimal> + 'm {
    fields
        .iter()
        .filter(move |(key, _)| key.ends_with(suffix))
        .map(|(_, value)| *value)
}

/// Network names found as `<network>_daily_tx` keys.
pub fn discovered_networks(blockchain: &BTreeMap<String, Decimal>) -> impl Iterator<Item = &str> {
    blockchain
        .keys()
        .filter_map(|key| key.strip_suffix(DAILY_TX_SUFFIX))
        .filter(|network| !network.is_empty())
}

/// Per-network daily transactions and their sum; `None` when no network reports any.
pub fn daily_transactions(
    blockchain: &BTreeMap<String, Decimal>,
    networks: &[String],
) -> Option<(Decimal, BTreeMap<String, Decimal>)> {
    let per_network: BTreeMap<String, Decimal> = networks
        .iter()
        .filter_map(|network| {
            blockchain
                .get(&format!("{network}{DAILY_TX_SUFFIX}"))
                .map(|count| (network.clone(), (*count).max(Decimal::ZERO)))
        })
        .collect();
    if per_network.is_empty() {
        return None;
    }
    Some((saturating_sum(per_network.values().copied()), per_network))
}

/// `min(apy / apy_cap, 1) x (1 - risk)`.
pub fn defi_subscore(
    defi: &BTreeMap<String, Decimal>,
    config: &OnchainConfig,
    fallbacks: &mut Fallbacks,
) -> Decimal {
    let apy = match defi.get(APY_KEY) {
        Some(apy) => capped_ratio(*apy, config.apy_cap),
        None => fallbacks.substitute("defi_integration", APY_KEY),
    };
    let risk = match defi.get(RISK_KEY) {
        Some(risk) => clamp_unit(*risk),
        None => fallbacks.substitute("defi_integration", RISK_KEY),
    };
    apy * (Decimal::ONE - risk)
}

/// Mean bridge success rate, discounted by latency and cost.
///
/// Without any success rate, the log-scaled transfer count (`transfer_index`) stands
/// in as the bridge usage signal before the neutral value is used.
pub fn cross_chain_subscore(
    cross_chain: &BTreeMap<String, Decimal>,
    transfer_index: Option<Decimal>,
    config: &OnchainConfig,
    fallbacks: &mut Fallbacks,
) -> Decimal {
    let success = mean(with_suffix(cross_chain, "_success_rate").map(as_fraction))
        .or(transfer_index)
        .unwrap_or_else(|| fallbacks.substitute("cross_chain_efficiency", "*_success_rate"));

    let mut penalty = Decimal::ZERO;
    if let Some(seconds) = mean(with_suffix(cross_chain, "_time_seconds")) {
        let slowness = capped_ratio(seconds, config.reference_latency_secs);
        penalty += config.latency_penalty * slowness;
    }
    if let Some(cost) = mean(with_suffix(cross_chain, "_cost_usd")) {
        let expense = capped_ratio(cost, config.reference_cost_usd);
        penalty += config.cost_penalty * expense;
    }

    clamp_unit(success * (Decimal::ONE - penalty))
}

/// `1 - minmax(cost)`; every market scores 1 when all costs are equal.
pub fn gas_optimization(cost: Decimal, bounds: (Decimal, Decimal)) -> Decimal {
    let (min, max) = bounds;
    min_max_scale(cost, min, max)
        .map(|scaled| Decimal::ONE - scaled)
        .unwrap_or(Decimal::ONE)
}

pub fn smart_contract_subscore(
    contract: &BTreeMap<String, Decimal>,
    gas_optimization: Option<Decimal>,
    config: &OnchainConfig,
    fallbacks: &mut Fallbacks,
) -> Decimal {
    let execution = match contract.get(EXECUTION_KEY) {
        Some(rate) => as_fraction(*rate),
        None => fallbacks.substitute("smart_contract_performance", EXECUTION_KEY),
    };
    let gas = gas_optimization
        .unwrap_or_else(|| fallbacks.substitute("smart_contract_performance", COST_KEY));
    clamp_unit(config.execution_weight * execution + config.gas_weight * gas)
}
