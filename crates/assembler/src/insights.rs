//! Headline findings and per-analysis conclusions.

use crate::report::{Conclusions, Methodology};
use core_types::scale::mean;
use core_types::{AnalysisWarning, FrictionKind, MarketRecord, ProviderType};
use efficiency::EfficiencyReport;
use onchain::OnchainReport;
use rust_decimal::Decimal;
use sourcing::{PrimarySource, SourcingReport};
use std::collections::BTreeMap;

pub fn methodology(onchain_included: bool) -> Methodology {
    Methodology {
        data_normalization: "Numeric text is cleaned of currency symbols and separators, \
            scaled by its unit suffix and checked against the transaction and agent \
            invariants. Each record receives a quality score from completeness, \
            consistency and source reliability; values far above the cross-market \
            median are flagged as outliers."
            .to_string(),
        liquidity_sourcing: "Volumes are summed per liquidity source type across all \
            markets and ranked by share of the grand total. Regional concentration is \
            the share of the largest source within each region."
            .to_string(),
        efficiency_measurement: "Each market is scored on operational (transaction \
            success), financial (float turnover), network (agent activity and coverage) \
            and user (growth) dimensions. The weighted sum gives a 0-100 composite \
            mapped to a letter grade; agent float and cash ratios identify friction."
            .to_string(),
        onchain_integration: onchain_included.then(|| {
            "Blockchain adoption, DeFi yield net of contract risk, cross-chain bridge \
                efficiency and smart contract performance are combined into an onchain \
                score, which is blended with the offchain composite into a hybrid score."
                .to_string()
        }),
    }
}

fn percent(value: Decimal) -> Decimal {
    value.round_dp(1).normalize()
}

/// The report's headline statements, in a fixed order.
pub fn findings(
    markets: &[MarketRecord],
    sourcing: &SourcingReport,
    efficiency: &EfficiencyReport,
    onchain: Option<&OnchainReport>,
    warnings: &[AnalysisWarning],
) -> Vec<String> {
    let mut findings = Vec::new();

    let count = |kind: ProviderType| markets.iter().filter(|m| m.provider_type == kind).count();
    findings.push(format!(
        "{} providers analyzed ({} offchain, {} onchain, {} hybrid)",
        markets.len(),
        count(ProviderType::Offchain),
        count(ProviderType::Onchain),
        count(ProviderType::Hybrid)
    ));

    match &sourcing.primary_source {
        PrimarySource::Identified {
            source_type,
            percentage,
            ..
        } => findings.push(format!(
            "{source_type} is the primary liquidity source with {}% of total volume",
            percent(*percentage)
        )),
        PrimarySource::InsufficientData => findings
            .push("No liquidity source volume reported; primary source undetermined".to_string()),
    }

    if let Some(aggregate) = &efficiency.aggregate {
        findings.push(format!(
            "Mean efficiency score {} / 100 (best: {}, worst: {})",
            aggregate.mean_score.round_dp(2),
            aggregate.best_market,
            aggregate.worst_market
        ));
    }

    let cash_out = efficiency
        .markets
        .iter()
        .filter(|m| m.friction.has(FrictionKind::CashOutRisk))
        .count();
    if cash_out > 0 {
        findings.push(format!(
            "{cash_out} of {} scored markets show {}",
            efficiency.markets.len(),
            FrictionKind::CashOutRisk
        ));
    }

    if let Some(onchain) = onchain {
        let mut line = format!(
            "Onchain data for {} markets, average onchain score {} / 100",
            onchain.markets.len(),
            onchain.average_onchain_score
        );
        if let Some(hybrid) = onchain.average_hybrid_score {
            line.push_str(&format!(", average hybrid score {hybrid} / 100"));
        }
        findings.push(line);
    }
    let without_onchain = markets
        .iter()
        .filter(|m| m.provider_type.has_onchain_rails() && !m.has_onchain())
        .count();
    if without_onchain > 0 {
        findings.push(format!(
            "{without_onchain} onchain or hybrid providers report no onchain metrics"
        ));
    }

    if let Some(quality) = mean(markets.iter().map(|m| m.quality.score)) {
        findings.push(format!("Average data quality score {}", quality.round_dp(2)));
    }

    if !warnings.is_empty() {
        let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
        for warning in warnings {
            *by_kind.entry(warning.kind()).or_default() += 1;
        }
        let breakdown: Vec<String> = by_kind
            .iter()
            .map(|(kind, n)| format!("{kind}: {n}"))
            .collect();
        findings.push(format!(
            "{} data warnings raised ({})",
            warnings.len(),
            breakdown.join(", ")
        ));
    }

    findings
}

pub fn conclusions(
    sourcing: &SourcingReport,
    efficiency: &EfficiencyReport,
    onchain: Option<&OnchainReport>,
) -> Conclusions {
    let mut conclusions = Conclusions::default();

    for (region, regional) in &sourcing.regional {
        let mut line = format!(
            "{region}: {} markets, {} source types",
            regional.markets.len(),
            regional.common_sources.len()
        );
        if let (Some(top), Some(concentration)) = (&regional.top_source, regional.concentration) {
            line.push_str(&format!(
                ", led by {top} ({}% concentration)",
                percent(concentration * Decimal::ONE_HUNDRED)
            ));
        }
        conclusions.sourcing.push(line);
    }
    if let Some(ratio) = sourcing.channel_comparison.tvl_to_offchain_ratio {
        conclusions.sourcing.push(format!(
            "Onchain value locked equals {}x the offchain liquidity volume",
            ratio.round_dp(4).normalize()
        ));
    }

    conclusions.efficiency = efficiency.insights.all().cloned().collect();

    if let Some(onchain) = onchain {
        conclusions.onchain = onchain.insights.findings.clone();
    }

    conclusions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sourcing::RegionalSourcing;

    #[test]
    fn test_methodology_mentions_onchain_only_when_present() {
        assert!(methodology(false).onchain_integration.is_none());
        assert!(methodology(true).onchain_integration.is_some());
    }

    #[test]
    fn test_findings_summarise_warnings_by_kind() {
        let markets = vec![MarketRecord::new("M-Pesa", "Kenya", "East Africa", ProviderType::Offchain)];
        let warnings = vec![
            AnalysisWarning::insufficient_data("M-Pesa", "successful exceeds attempted"),
            AnalysisWarning::insufficient_data("sourcing", "no volume"),
            AnalysisWarning::UnknownUnit {
                market: "M-Pesa".to_string(),
                field: "float_metrics.total_volume".to_string(),
                unit: "crore".to_string(),
            },
        ];
        let findings = findings(
            &markets,
            &SourcingReport::new(),
            &EfficiencyReport::new(),
            None,
            &warnings,
        );

        assert_eq!(findings[0], "1 providers analyzed (1 offchain, 0 onchain, 0 hybrid)");
        assert_eq!(
            findings[1],
            "No liquidity source volume reported; primary source undetermined"
        );
        assert_eq!(
            findings.last().unwrap(),
            "3 data warnings raised (insufficient_data: 2, unknown_unit: 1)"
        );
    }

    #[test]
    fn test_findings_flag_onchain_providers_without_metrics() {
        let markets = vec![
            MarketRecord::new("Celo", "Global", "Global", ProviderType::Onchain),
            MarketRecord::new("M-Pesa", "Kenya", "East Africa", ProviderType::Offchain),
        ];
        let findings = findings(
            &markets,
            &SourcingReport::new(),
            &EfficiencyReport::new(),
            None,
            &[],
        );
        assert!(findings.contains(&"1 onchain or hybrid providers report no onchain metrics".to_string()));
    }

    #[test]
    fn test_sourcing_conclusions_per_region() {
        let mut sourcing = SourcingReport::new();
        sourcing.regional.insert(
            "East Africa".to_string(),
            RegionalSourcing {
                markets: vec!["M-Pesa".to_string(), "Airtel".to_string()],
                total_volume: dec!(100),
                top_source: Some("agent_network".to_string()),
                concentration: Some(dec!(0.625)),
                common_sources: vec!["agent_network".to_string(), "commercial_bank".to_string()],
                average_volume_per_market: Some(dec!(50)),
                distribution: Vec::new(),
            },
        );
        let conclusions = conclusions(&sourcing, &EfficiencyReport::new(), None);

        assert_eq!(
            conclusions.sourcing,
            vec!["East Africa: 2 markets, 2 source types, led by agent_network (62.5% concentration)"]
        );
        assert!(conclusions.onchain.is_empty());
    }
}
