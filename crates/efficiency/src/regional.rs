//! Regional comparison, disparity gaps and narrative insights.

use crate::report::{
    AggregateEfficiency, EfficiencyInsights, MarketEfficiency, RegionalEfficiency, RegionalGap,
};
use core_types::FrictionKind;
use core_types::scale::mean;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub fn compare_regions(markets: &[MarketEfficiency]) -> BTreeMap<String, RegionalEfficiency> {
    let mut by_region: BTreeMap<&str, Vec<&MarketEfficiency>> = BTreeMap::new();
    for market in markets {
        by_region.entry(market.region.as_str()).or_default().push(market);
    }

    by_region
        .into_iter()
        .map(|(region, members)| {
            let regional = RegionalEfficiency {
                markets: members.iter().map(|m| m.market_name.clone()).collect(),
                average_success_rate_pct: mean(members.iter().filter_map(|m| m.success_rate_pct)),
                average_agent_utilization_pct: mean(
                    members.iter().filter_map(|m| m.agent_utilization_pct),
                ),
                average_float_turnover: mean(members.iter().filter_map(|m| m.float_turnover)),
                average_score: mean(members.iter().map(|m| m.composite_score))
                    .unwrap_or_default()
                    .round_dp(2),
            };
            (region.to_string(), regional)
        })
        .collect()
}

/// One gap per pair of regions, in name order. Empty with fewer than two regions.
pub fn disparities(regional: &BTreeMap<String, RegionalEfficiency>) -> Vec<RegionalGap> {
    let regions: Vec<(&String, &RegionalEfficiency)> = regional.iter().collect();
    let gap = |a: Option<Decimal>, b: Option<Decimal>| a.zip(b).map(|(a, b)| a - b);

    let mut gaps = Vec::new();
    for (i, (name_a, a)) in regions.iter().enumerate() {
        for (name_b, b) in &regions[i + 1..] {
            gaps.push(RegionalGap {
                region_a: name_a.to_string(),
                region_b: name_b.to_string(),
                success_rate_gap: gap(a.average_success_rate_pct, b.average_success_rate_pct),
                agent_utilization_gap: gap(
                    a.average_agent_utilization_pct,
                    b.average_agent_utilization_pct,
                ),
                float_turnover_gap: gap(a.average_float_turnover, b.average_float_turnover),
                score_gap: a.average_score - b.average_score,
            });
        }
    }
    gaps
}

fn signed(value: Decimal) -> String {
    let value = value.round_dp(1).normalize();
    if value > Decimal::ZERO {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// Score range, success-rate gaps above `gap_threshold` points, and agent
/// e-float shortages.
pub fn generate_insights(
    markets: &[MarketEfficiency],
    aggregate: Option<&AggregateEfficiency>,
    gaps: &[RegionalGap],
    gap_threshold: Decimal,
) -> EfficiencyInsights {
    let mut insights = EfficiencyInsights::default();

    if let Some(aggregate) = aggregate {
        insights.key_findings.push(format!(
            "Efficiency scores range from {} to {} across {} markets",
            aggregate.min_score.round_dp(1),
            aggregate.max_score.round_dp(1),
            markets.len()
        ));
        insights.key_findings.push(format!(
            "{} is the most efficient market, {} the least",
            aggregate.best_market, aggregate.worst_market
        ));
    }

    for gap in gaps {
        let Some(success_gap) = gap.success_rate_gap else {
            continue;
        };
        if success_gap.abs() > gap_threshold {
            insights.regional_patterns.push(format!(
                "Success rate gap of {} points between {} and {}",
                signed(success_gap),
                gap.region_a,
                gap.region_b
            ));
        }
    }

    for market in markets {
        let friction = &market.friction;
        if let Some(short) = friction.low_liquidity_agents.filter(|n| *n > 0) {
            insights
                .efficiency_drivers
                .push(format!("{}: {} agents lack e-float", market.market_name, short));
        }
        if friction.has(FrictionKind::CashOutRisk) {
            insights.efficiency_drivers.push(format!(
                "{}: {} (only {}% of active agents hold e-float)",
                market.market_name,
                FrictionKind::CashOutRisk,
                friction
                    .liquidity_ratio
                    .map(|r| (r * Decimal::ONE_HUNDRED).round_dp(1))
                    .unwrap_or_default()
            ));
        }
        if friction.has(FrictionKind::CashInRisk) {
            insights.efficiency_drivers.push(format!(
                "{}: {} (only {}% of active agents hold cash)",
                market.market_name,
                FrictionKind::CashInRisk,
                friction
                    .cash_ratio
                    .map(|r| (r * Decimal::ONE_HUNDRED).round_dp(1))
                    .unwrap_or_default()
            ));
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::friction::FrictionAnalysis;
    use crate::report::DimensionScores;
    use core_types::{Grade, ProviderType};
    use rust_decimal_macros::dec;

    fn scored(name: &str, region: &str, success: Decimal, score: Decimal) -> MarketEfficiency {
        MarketEfficiency {
            market_name: name.to_string(),
            record_index: 0,
            region: region.to_string(),
            provider_type: ProviderType::Offchain,
            success_rate_pct: Some(success),
            failure_rate_pct: None,
            float_turnover: None,
            float_velocity: None,
            agent_utilization_pct: Some(dec!(80)),
            dimensions: DimensionScores::default(),
            composite_score: score,
            grade: Grade::C,
            friction: FrictionAnalysis::default(),
            annotations: Vec::new(),
        }
    }

    #[test]
    fn test_regions_average_their_markets() {
        let markets = vec![
            scored("A", "East", dec!(90), dec!(70)),
            scored("B", "East", dec!(80), dec!(60)),
            scored("C", "West", dec!(95), dec!(80)),
        ];
        let regional = compare_regions(&markets);

        assert_eq!(regional["East"].markets, vec!["A", "B"]);
        assert_eq!(regional["East"].average_success_rate_pct, Some(dec!(85)));
        assert_eq!(regional["East"].average_score, dec!(65));
        assert_eq!(regional["East"].average_float_turnover, None);
    }

    #[test]
    fn test_disparities_and_gap_insights() {
        let markets = vec![
            scored("A", "East", dec!(85), dec!(65)),
            scored("C", "West", dec!(95), dec!(80)),
            scored("D", "North", dec!(90), dec!(70)),
        ];
        let regional = compare_regions(&markets);
        let gaps = disparities(&regional);

        // East-North, East-West, North-West.
        assert_eq!(gaps.len(), 3);
        assert_eq!(gaps[1].region_a, "East");
        assert_eq!(gaps[1].region_b, "West");
        assert_eq!(gaps[1].success_rate_gap, Some(dec!(-10)));
        assert_eq!(gaps[1].score_gap, dec!(-15));

        let insights = generate_insights(&markets, None, &gaps, dec!(5));
        assert_eq!(
            insights.regional_patterns,
            vec!["Success rate gap of -10 points between East and West".to_string()]
        );
    }

    #[test]
    fn test_single_region_has_no_disparities() {
        let regional = compare_regions(&[scored("A", "East", dec!(90), dec!(70))]);
        assert!(disparities(&regional).is_empty());
    }

    #[test]
    fn test_float_shortages_are_drivers() {
        let mut market = scored("M-Pesa", "East", dec!(90), dec!(60));
        market.friction = FrictionAnalysis {
            flags: vec![FrictionKind::CashOutRisk],
            liquidity_ratio: Some(dec!(0.375)),
            low_liquidity_agents: Some(700),
            ..FrictionAnalysis::default()
        };
        let insights = generate_insights(&[market], None, &[], dec!(5));

        assert_eq!(insights.efficiency_drivers[0], "M-Pesa: 700 agents lack e-float");
        assert_eq!(
            insights.efficiency_drivers[1],
            "M-Pesa: cash-out risk (only 37.5% of active agents hold e-float)"
        );
    }
}
