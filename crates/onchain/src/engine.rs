use crate::report::{BlockchainAdoption, MarketOnchain, OnchainInsights, OnchainReport, OnchainSubscores};
use crate::subscores::{
    APY_KEY, BRIDGE_VOLUME_KEY, COST_KEY, Fallbacks, LogScaler, TRANSFERS_KEY, TVL_KEY,
    cross_chain_subscore,
    daily_transactions, defi_subscore, discovered_networks, gas_optimization,
    smart_contract_subscore,
};
use configuration::OnchainConfig;
use core_types::scale::{find_min_max, mean, saturating_sum};
use core_types::{MarketRecord, OnchainSection};
use efficiency::EfficiencyReport;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

/// Scores the blockchain and DeFi side of every market that carries onchain data,
/// and blends it with the offchain efficiency score.
#[derive(Debug, Clone, Default)]
pub struct OnchainAnalyzer {
    config: OnchainConfig,
}

impl OnchainAnalyzer {
    pub fn new(config: OnchainConfig) -> Self {
        Self { config }
    }

    /// Returns `None` when no record has an onchain section. That is a normal outcome,
    /// not an error.
    pub fn analyze(
        &self,
        records: &[MarketRecord],
        efficiency: &EfficiencyReport,
    ) -> Option<OnchainReport> {
        let (positions, onchain): (Vec<usize>, Vec<(&MarketRecord, &OnchainSection)>) = records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.onchain.as_ref().map(|section| (i, (r, section))))
            .unzip();
        if onchain.is_empty() {
            tracing::info!("No onchain data present; onchain analysis skipped.");
            return None;
        }

        let networks = self.networks(&onchain);

        // Cross-market scales.
        let tvl_scaler = LogScaler::new(
            onchain
                .iter()
                .filter_map(|(_, s)| s.blockchain_metrics.get(TVL_KEY).copied()),
        );
        let transactions: Vec<_> = onchain
            .iter()
            .map(|(_, s)| daily_transactions(&s.blockchain_metrics, &networks))
            .collect();
        let tx_scaler = LogScaler::new(transactions.iter().flatten().map(|(total, _)| *total));
        let transfer_scaler = LogScaler::new(
            onchain
                .iter()
                .filter_map(|(_, s)| s.cross_chain_efficiency.get(TRANSFERS_KEY).copied()),
        );
        let cost_bounds = find_min_max(
            onchain
                .iter()
                .filter_map(|(_, s)| s.smart_contract_performance.get(COST_KEY).copied()),
        );

        let mut markets = Vec::with_capacity(onchain.len());
        let mut warnings = Vec::new();
        for (((record, section), transactions), position) in
            onchain.iter().zip(transactions).zip(positions)
        {
            let mut fallbacks =
                Fallbacks::new(&record.market_name, self.config.missing_field_value);

            // --- Blockchain adoption ---
            let tvl_usd = section.blockchain_metrics.get(TVL_KEY).copied();
            let tvl_index = match tvl_usd {
                Some(tvl) => tvl_scaler.index(tvl),
                None => fallbacks.substitute("blockchain_metrics", TVL_KEY),
            };
            let (daily_transactions, network_transactions) = match transactions {
                Some((total, per_network)) => (Some(total), per_network),
                None => (None, Default::default()),
            };
            let transaction_index = match daily_transactions {
                Some(total) => tx_scaler.index(total),
                None => fallbacks.substitute("blockchain_metrics", "*_daily_tx"),
            };
            let adoption = BlockchainAdoption {
                tvl_usd,
                daily_transactions,
                network_transactions,
                tvl_index,
                transaction_index,
                adoption_index: (tvl_index + transaction_index) / dec!(2),
            };

            // --- DeFi, bridges, contracts ---
            let defi = defi_subscore(&section.defi_integration, &self.config, &mut fallbacks);
            let transfer_index = section
                .cross_chain_efficiency
                .get(TRANSFERS_KEY)
                .map(|transfers| transfer_scaler.index(*transfers));
            let cross_chain = cross_chain_subscore(
                &section.cross_chain_efficiency,
                transfer_index,
                &self.config,
                &mut fallbacks,
            );
            let gas = section
                .smart_contract_performance
                .get(COST_KEY)
                .zip(cost_bounds)
                .map(|(cost, bounds)| gas_optimization(*cost, bounds));
            let smart_contract = smart_contract_subscore(
                &section.smart_contract_performance,
                gas,
                &self.config,
                &mut fallbacks,
            );

            let subscores = OnchainSubscores {
                blockchain: adoption.adoption_index,
                defi,
                cross_chain,
                smart_contract,
            };
            let onchain_score = self.composite(&subscores);
            let offchain_score = efficiency.score_at(position);
            let hybrid_score = offchain_score.map(|offchain| self.blend(offchain, onchain_score));

            tracing::debug!(
                market = %record.market_name,
                onchain_score = %onchain_score,
                missing = fallbacks.missing.len(),
                "Onchain market scored."
            );

            warnings.extend(fallbacks.warnings);
            markets.push(MarketOnchain {
                market_name: record.market_name.clone(),
                provider_type: record.provider_type,
                adoption,
                gas_optimization: gas,
                subscores,
                onchain_score,
                offchain_score,
                hybrid_score,
                missing_fields: fallbacks.missing,
            });
        }

        let insights = insights(&onchain, &markets);
        let report = OnchainReport {
            average_onchain_score: mean(markets.iter().map(|m| m.onchain_score))
                .unwrap_or_default()
                .round_dp(2),
            average_hybrid_score: mean(markets.iter().filter_map(|m| m.hybrid_score))
                .map(|s| s.round_dp(2)),
            markets,
            networks,
            insights,
            warnings,
        };

        tracing::info!(
            markets = report.markets.len(),
            networks = report.networks.len(),
            average_onchain_score = %report.average_onchain_score,
            "Onchain analysis complete."
        );
        Some(report)
    }

    /// Configured networks first, then any other network found in the data, by name.
    fn networks(&self, onchain: &[(&MarketRecord, &OnchainSection)]) -> Vec<String> {
        let mut networks = self.config.networks.clone();
        let discovered: BTreeSet<&str> = onchain
            .iter()
            .flat_map(|(_, s)| discovered_networks(&s.blockchain_metrics))
            .collect();
        for network in discovered {
            if !networks.iter().any(|n| n == network) {
                networks.push(network.to_string());
            }
        }
        networks
    }

    /// Weighted sub-scores on the 0-100 scale.
    fn composite(&self, subscores: &OnchainSubscores) -> Decimal {
        let w = &self.config.subscore_weights;
        let weighted = w.blockchain * subscores.blockchain
            + w.defi * subscores.defi
            + w.cross_chain * subscores.cross_chain
            + w.smart_contract * subscores.smart_contract;
        (weighted * dec!(100)).max(Decimal::ZERO).min(dec!(100)).round_dp(2)
    }

    fn blend(&self, offchain: Decimal, onchain: Decimal) -> Decimal {
        let weight = self.config.offchain_blend_weight;
        (weight * offchain + (Decimal::ONE - weight) * onchain).round_dp(2)
    }
}

fn insights(onchain: &[(&MarketRecord, &OnchainSection)], markets: &[MarketOnchain]) -> OnchainInsights {
    let total_tvl_usd = saturating_sum(
        onchain
            .iter()
            .filter_map(|(_, s)| s.blockchain_metrics.get(TVL_KEY).copied()),
    );
    let average_apy_pct = mean(
        onchain
            .iter()
            .filter_map(|(_, s)| s.defi_integration.get(APY_KEY).copied())
            .filter(|apy| *apy > Decimal::ZERO),
    )
    .map(|apy| apy.round_dp(2));
    let daily_bridge_volume_usd = saturating_sum(
        onchain
            .iter()
            .filter_map(|(_, s)| s.cross_chain_efficiency.get(BRIDGE_VOLUME_KEY).copied()),
    );
    let daily_cross_chain_transfers = saturating_sum(
        onchain
            .iter()
            .filter_map(|(_, s)| s.cross_chain_efficiency.get(TRANSFERS_KEY).copied()),
    );

    let mut findings = Vec::new();
    if total_tvl_usd > Decimal::ZERO {
        findings.push(format!(
            "{} USD total value locked across {} onchain markets",
            total_tvl_usd.round_dp(0),
            markets.iter().filter(|m| m.adoption.tvl_usd.is_some()).count()
        ));
    }
    if let Some(apy) = average_apy_pct {
        findings.push(format!("Average DeFi APY of {apy}% across integrated protocols"));
    }
    if daily_bridge_volume_usd > Decimal::ZERO {
        findings.push(format!(
            "{} USD daily cross-chain bridge volume",
            daily_bridge_volume_usd.round_dp(0)
        ));
    }
    if daily_cross_chain_transfers > Decimal::ZERO {
        findings.push(format!(
            "{} daily cross-chain transfers",
            daily_cross_chain_transfers.round_dp(0)
        ));
    }
    let best = markets.iter().fold(None::<&MarketOnchain>, |best, m| match best {
        Some(b) if b.onchain_score > m.onchain_score => Some(b),
        Some(b) if b.onchain_score == m.onchain_score && b.market_name <= m.market_name => Some(b),
        _ => Some(m),
    });
    if let Some(best) = best {
        findings.push(format!(
            "{} has the strongest onchain profile ({} / 100)",
            best.market_name, best.onchain_score
        ));
    }

    OnchainInsights {
        total_tvl_usd,
        average_apy_pct,
        daily_bridge_volume_usd,
        daily_cross_chain_transfers,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ProviderType;
    use efficiency::EfficiencyAnalyzer;
    use std::collections::BTreeMap;

    fn fields(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn full_section(tvl: Decimal, celo_tx: Decimal, cost: Decimal) -> OnchainSection {
        OnchainSection {
            blockchain_metrics: fields(&[(TVL_KEY, tvl), ("celo_daily_tx", celo_tx)]),
            defi_integration: fields(&[(APY_KEY, dec!(7.5)), ("smart_contract_risk_score", dec!(0.2))]),
            cross_chain_efficiency: fields(&[("celo_stellar_success_rate", dec!(1))]),
            smart_contract_performance: fields(&[
                ("execution_success_rate", dec!(1)),
                (COST_KEY, cost),
            ]),
        }
    }

    fn chain(name: &str, section: OnchainSection) -> MarketRecord {
        let mut record = MarketRecord::new(name, "Global", "Global", ProviderType::Onchain);
        record.onchain = Some(section);
        record
    }

    #[test]
    fn test_no_onchain_data_yields_none() {
        let records = vec![MarketRecord::new("M-Pesa", "Kenya", "East", ProviderType::Offchain)];
        assert!(OnchainAnalyzer::default().analyze(&records, &EfficiencyReport::new()).is_none());
    }

    #[test]
    fn test_subscores_across_markets() {
        let records = vec![
            chain("Big", full_section(dec!(1000000), dec!(5000), dec!(0.01))),
            chain("Small", full_section(dec!(0), dec!(0), dec!(0.05))),
        ];
        let report = OnchainAnalyzer::default()
            .analyze(&records, &EfficiencyReport::new())
            .unwrap();

        let big = report.market("Big").unwrap();
        assert_eq!(big.adoption.adoption_index, Decimal::ONE);
        assert_eq!(big.subscores.defi, dec!(0.4));
        assert_eq!(big.subscores.cross_chain, Decimal::ONE);
        assert_eq!(big.subscores.smart_contract, Decimal::ONE);
        // 0.25 * (1 + 0.4 + 1 + 1) = 0.85
        assert_eq!(big.onchain_score, dec!(85));
        assert!(big.missing_fields.is_empty());
        assert_eq!(big.hybrid_score, None);

        let small = report.market("Small").unwrap();
        assert_eq!(small.adoption.adoption_index, Decimal::ZERO);
        assert_eq!(small.gas_optimization, Some(Decimal::ZERO));
        // 0.25 * (0 + 0.4 + 1 + 0.6)
        assert_eq!(small.onchain_score, dec!(50));

        assert_eq!(report.insights.total_tvl_usd, dec!(1000000));
        assert_eq!(report.insights.average_apy_pct, Some(dec!(7.5)));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_fields_are_neutral_and_flagged() {
        let records = vec![chain("Sparse", OnchainSection::default())];
        let report = OnchainAnalyzer::default()
            .analyze(&records, &EfficiencyReport::new())
            .unwrap();
        let sparse = &report.markets[0];

        // Blockchain 0.5, DeFi 0.5 * 0.5, cross-chain 0.5, contracts 0.5.
        assert_eq!(sparse.onchain_score, dec!(43.75));
        assert_eq!(sparse.missing_fields.len(), 7);
        assert_eq!(report.warnings.len(), 7);
        assert!(report.warnings.iter().all(|w| w.kind() == "fallback"));
    }

    #[test]
    fn test_hybrid_blends_offchain_and_onchain() {
        let mut hybrid = chain("M-Pesa", full_section(dec!(1000), dec!(10), dec!(0.02)));
        hybrid.provider_type = ProviderType::Hybrid;
        hybrid.transaction_metrics.attempted = Some(100);
        hybrid.transaction_metrics.successful = Some(100);

        let records = vec![hybrid];
        let efficiency = EfficiencyAnalyzer::default().analyze(&records).unwrap();
        let offchain = efficiency.score_at(0).unwrap();

        let report = OnchainAnalyzer::default().analyze(&records, &efficiency).unwrap();
        let market = &report.markets[0];

        assert_eq!(market.offchain_score, Some(offchain));
        let expected = (dec!(0.7) * offchain + dec!(0.3) * market.onchain_score).round_dp(2);
        assert_eq!(market.hybrid_score, Some(expected));
        assert_eq!(report.average_hybrid_score, Some(expected));
    }

    #[test]
    fn test_hybrid_blend_follows_record_not_name() {
        let mut strong = chain("Wallet", full_section(dec!(1000), dec!(10), dec!(0.02)));
        strong.provider_type = ProviderType::Hybrid;
        strong.transaction_metrics.attempted = Some(100);
        strong.transaction_metrics.successful = Some(100);
        let mut weak = strong.clone();
        weak.transaction_metrics.successful = Some(10);

        let records = vec![strong, weak];
        let efficiency = EfficiencyAnalyzer::default().analyze(&records).unwrap();
        let report = OnchainAnalyzer::default().analyze(&records, &efficiency).unwrap();

        assert_eq!(report.markets[0].offchain_score, Some(efficiency.markets[0].composite_score));
        assert_eq!(report.markets[1].offchain_score, Some(efficiency.markets[1].composite_score));
        assert_ne!(report.markets[0].hybrid_score, report.markets[1].hybrid_score);
    }

    #[test]
    fn test_cross_chain_transfers_score_bridges_without_rates() {
        let busy = OnchainSection {
            cross_chain_efficiency: fields(&[(TRANSFERS_KEY, dec!(1200))]),
            ..OnchainSection::default()
        };
        let idle = OnchainSection {
            cross_chain_efficiency: fields(&[(TRANSFERS_KEY, dec!(0))]),
            ..OnchainSection::default()
        };
        let records = vec![chain("Busy", busy), chain("Idle", idle)];
        let report = OnchainAnalyzer::default()
            .analyze(&records, &EfficiencyReport::new())
            .unwrap();

        assert_eq!(report.markets[0].subscores.cross_chain, Decimal::ONE);
        assert_eq!(report.markets[1].subscores.cross_chain, Decimal::ZERO);
        assert!(
            report.markets[0]
                .missing_fields
                .iter()
                .all(|m| m.group != "cross_chain_efficiency")
        );
        assert_eq!(report.insights.daily_cross_chain_transfers, dec!(1200));
        assert!(
            report
                .insights
                .findings
                .contains(&"1200 daily cross-chain transfers".to_string())
        );
    }

    #[test]
    fn test_huge_tvl_totals_saturate() {
        let big = dec!(50000000000000000000000000000);
        let records = vec![
            chain("A", full_section(big, dec!(1), dec!(0.01))),
            chain("B", full_section(big, dec!(1), dec!(0.01))),
        ];
        let report = OnchainAnalyzer::default()
            .analyze(&records, &EfficiencyReport::new())
            .unwrap();
        assert_eq!(report.insights.total_tvl_usd, Decimal::MAX);
    }

    #[test]
    fn test_discovered_networks_are_appended() {
        let mut section = full_section(dec!(1), dec!(1), dec!(1));
        section.blockchain_metrics.insert("tron_daily_tx".to_string(), dec!(9));
        let report = OnchainAnalyzer::default()
            .analyze(&[chain("A", section)], &EfficiencyReport::new())
            .unwrap();

        assert_eq!(report.networks, vec!["celo", "stellar", "ethereum", "polygon", "tron"]);
        assert_eq!(report.markets[0].adoption.daily_transactions, Some(dec!(10)));
    }
}
