//! Agent network friction: where cash-out and cash-in services are likely to fail.

use configuration::FrictionThresholds;
use core_types::scale::ratio;
use core_types::{AgentNetwork, FrictionKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionAnalysis {
    pub flags: Vec<FrictionKind>,
    /// `with_liquidity / active`.
    pub liquidity_ratio: Option<Decimal>,
    /// `with_cash / active`.
    pub cash_ratio: Option<Decimal>,

    // Agents missing each capability, counted against the whole network.
    pub low_liquidity_agents: Option<u64>,
    pub low_cash_agents: Option<u64>,
    pub inactive_agents: Option<u64>,
    /// The counts above as a percentage of `total`.
    pub liquidity_friction_rate: Option<Decimal>,
    pub cash_friction_rate: Option<Decimal>,
    pub utilization_friction_rate: Option<Decimal>,
}

impl FrictionAnalysis {
    pub fn has(&self, kind: FrictionKind) -> bool {
        self.flags.contains(&kind)
    }
}

/// Flags cash-out and cash-in risk. Nothing is flagged without active agents.
pub fn analyze_friction(agents: &AgentNetwork, thresholds: &FrictionThresholds) -> FrictionAnalysis {
    let active = agents.active.map(Decimal::from).filter(|a| !a.is_zero());
    let liquidity_ratio = active
        .zip(agents.with_liquidity)
        .and_then(|(active, n)| ratio(Decimal::from(n), active));
    let cash_ratio = active
        .zip(agents.with_cash)
        .and_then(|(active, n)| ratio(Decimal::from(n), active));

    let mut flags = Vec::new();
    if liquidity_ratio.is_some_and(|r| r < thresholds.cash_out) {
        flags.push(FrictionKind::CashOutRisk);
    }
    if cash_ratio.is_some_and(|r| r < thresholds.cash_in) {
        flags.push(FrictionKind::CashInRisk);
    }

    let shortfall = |count: Option<u64>| agents.total.zip(count).map(|(t, c)| t.saturating_sub(c));
    let low_liquidity_agents = shortfall(agents.with_liquidity);
    let low_cash_agents = shortfall(agents.with_cash);
    let inactive_agents = shortfall(agents.active);

    let rate = |missing: Option<u64>| {
        let total = Decimal::from(agents.total?);
        ratio(Decimal::from(missing?), total).map(|r| r * dec!(100))
    };

    FrictionAnalysis {
        flags,
        liquidity_ratio,
        cash_ratio,
        low_liquidity_agents,
        low_cash_agents,
        inactive_agents,
        liquidity_friction_rate: rate(low_liquidity_agents),
        cash_friction_rate: rate(low_cash_agents),
        utilization_friction_rate: rate(inactive_agents),
    }
}
