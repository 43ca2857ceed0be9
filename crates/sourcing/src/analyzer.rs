use crate::error::SourcingError;
use crate::report::{
    ChannelComparison, MarketSourcing, PrimarySource, RegionalSourcing, SourceShare, SourcingReport,
};
use core_types::scale::{ratio, saturating_sum};
use core_types::{AnalysisWarning, MarketRecord};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};

/// Onchain keys read for the channel comparison.
const TVL_KEY: &str = "tvl_usd";
const DAILY_VOLUME_KEY: &str = "daily_volume_usd";

/// Ranks volumes by size, largest first, ties broken by source name.
///
/// Percentages are shares of `total`; they are all zero when `total` is zero.
pub fn rank_shares(volumes: &BTreeMap<String, Decimal>) -> (Vec<SourceShare>, Decimal) {
    let total = saturating_sum(volumes.values().copied());
    let mut shares: Vec<SourceShare> = volumes
        .iter()
        .map(|(source_type, volume)| SourceShare {
            source_type: source_type.clone(),
            total_volume: *volume,
            percentage: ratio(*volume, total)
                .map(|share| share * dec!(100))
                .unwrap_or(Decimal::ZERO),
        })
        .collect();

    shares.sort_by(|a, b| {
        b.total_volume
            .cmp(&a.total_volume)
            .then_with(|| a.source_type.cmp(&b.source_type))
    });
    (shares, total)
}

/// A stateless aggregator of liquidity volumes by source, market and region.
#[derive(Debug, Default)]
pub struct SourcingAnalyzer {}

impl SourcingAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for the sourcing analysis.
    ///
    /// # Returns
    ///
    /// A `SourcingReport`, or `SourcingError::NoRecords` for an empty slice. A zero
    /// grand total is not an error: the primary source is then `InsufficientData`.
    pub fn analyze(&self, records: &[MarketRecord]) -> Result<SourcingReport, SourcingError> {
        if records.is_empty() {
            return Err(SourcingError::NoRecords);
        }

        let mut report = SourcingReport::new();
        self.rank_sources(records, &mut report);
        self.analyze_markets(records, &mut report);
        self.analyze_regions(records, &mut report);
        self.compare_channels(records, &mut report);

        tracing::info!(
            markets = report.markets.len(),
            sources = report.ranked_sources.len(),
            regions = report.regional.len(),
            primary = report.primary_source.source_type().unwrap_or("none"),
            "Liquidity sourcing analysis complete."
        );
        Ok(report)
    }

    fn rank_sources(&self, records: &[MarketRecord], report: &mut SourcingReport) {
        let mut volumes: BTreeMap<String, Decimal> = BTreeMap::new();
        for record in records {
            for (source, volume) in &record.liquidity_sources {
                let entry = volumes.entry(source.clone()).or_default();
                *entry = entry.saturating_add(*volume);
            }
        }

        let (ranked, total) = rank_shares(&volumes);
        report.grand_total = total;
        if total == Decimal::MAX {
            tracing::warn!("Liquidity volumes exceed the representable range; totals saturated.");
            report.warnings.push(AnalysisWarning::insufficient_data(
                "liquidity sourcing",
                "total liquidity volume exceeds the representable range; shares are approximate",
            ));
        }

        report.primary_source = match ranked.first() {
            Some(top) if total > Decimal::ZERO => PrimarySource::Identified {
                source_type: top.source_type.clone(),
                total_volume: top.total_volume,
                percentage: top.percentage,
            },
            _ => {
                tracing::warn!("No liquidity volume reported by any market; primary source undetermined.");
                report.warnings.push(AnalysisWarning::insufficient_data(
                    "liquidity sourcing",
                    "total liquidity volume across all markets is zero",
                ));
                PrimarySource::InsufficientData
            }
        };
        report.ranked_sources = ranked;
    }

    fn analyze_markets(&self, records: &[MarketRecord], report: &mut SourcingReport) {
        report.markets = records
            .iter()
            .filter(|r| !r.liquidity_sources.is_empty())
            .map(|record| {
                let (distribution, total_volume) = rank_shares(&record.liquidity_sources);
                let primary_source = distribution
                    .first()
                    .filter(|_| total_volume > Decimal::ZERO)
                    .map(|top| top.source_type.clone());
                MarketSourcing {
                    market_name: record.market_name.clone(),
                    region: record.region.clone(),
                    total_volume,
                    primary_source,
                    distribution,
                }
            })
            .collect();
    }

    fn analyze_regions(&self, records: &[MarketRecord], report: &mut SourcingReport) {
        let mut by_region: BTreeMap<&str, Vec<&MarketRecord>> = BTreeMap::new();
        for record in records.iter().filter(|r| !r.liquidity_sources.is_empty()) {
            by_region.entry(record.region.as_str()).or_default().push(record);
        }

        for (region, members) in by_region {
            let mut volumes: BTreeMap<String, Decimal> = BTreeMap::new();
            let mut sources: BTreeSet<&str> = BTreeSet::new();
            for record in &members {
                for (source, volume) in &record.liquidity_sources {
                    let entry = volumes.entry(source.clone()).or_default();
                    *entry = entry.saturating_add(*volume);
                    sources.insert(source.as_str());
                }
            }

            let (distribution, total_volume) = rank_shares(&volumes);
            let top = distribution.first();
            let concentration = top.and_then(|t| ratio(t.total_volume, total_volume));
            if concentration.is_none() {
                report.warnings.push(AnalysisWarning::insufficient_data(
                    format!("region {region}"),
                    "total liquidity volume is zero, concentration undefined",
                ));
            }

            let regional = RegionalSourcing {
                markets: members.iter().map(|r| r.market_name.clone()).collect(),
                total_volume,
                top_source: top
                    .filter(|_| total_volume > Decimal::ZERO)
                    .map(|t| t.source_type.clone()),
                concentration,
                common_sources: sources.into_iter().map(String::from).collect(),
                average_volume_per_market: ratio(total_volume, Decimal::from(members.len() as u64)),
                distribution,
            };
            report.regional.insert(region.to_string(), regional);
        }
    }

    fn compare_channels(&self, records: &[MarketRecord], report: &mut SourcingReport) {
        let comparison = &mut report.channel_comparison;
        for record in records {
            if !record.liquidity_sources.is_empty() {
                comparison.offchain_markets.push(record.market_name.clone());
                comparison.offchain_volume =
                    comparison.offchain_volume.saturating_add(record.total_liquidity());
            }

            let Some(onchain) = &record.onchain else {
                continue;
            };
            let tvl = onchain.blockchain_metrics.get(TVL_KEY);
            let daily = onchain.blockchain_metrics.get(DAILY_VOLUME_KEY);
            if tvl.is_none() && daily.is_none() {
                continue;
            }
            comparison.onchain_markets.push(record.market_name.clone());
            comparison.onchain_tvl = comparison
                .onchain_tvl
                .saturating_add(tvl.copied().unwrap_or_default());
            comparison.onchain_daily_volume = comparison
                .onchain_daily_volume
                .saturating_add(daily.copied().unwrap_or_default());
        }

        if !comparison.onchain_markets.is_empty() {
            comparison.tvl_to_offchain_ratio =
                ratio(comparison.onchain_tvl, comparison.offchain_volume);
        }
    }
}
