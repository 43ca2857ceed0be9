use crate::error::EfficiencyError;
use crate::friction::analyze_friction;
use crate::regional;
use crate::report::{AggregateEfficiency, DimensionScores, EfficiencyReport, MarketEfficiency};
use configuration::{EfficiencyConfig, GradeThresholds};
use core_types::scale::{clamp_unit, find_min_max, mean, min_max_scale, ratio};
use core_types::{AgentNetwork, AnalysisWarning, Grade, MarketRecord, ProviderType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Maps a 0-100 composite score onto its grade band.
pub fn grade_for(score: Decimal, bands: &GradeThresholds) -> Grade {
    if score >= bands.a {
        Grade::A
    } else if score >= bands.b_plus {
        Grade::BPlus
    } else if score >= bands.b {
        Grade::B
    } else if score >= bands.b_minus {
        Grade::BMinus
    } else if score >= bands.c {
        Grade::C
    } else {
        Grade::D
    }
}

/// `total_volume / average_float`, when both are known and the float is positive.
fn float_turnover(record: &MarketRecord) -> Option<Decimal> {
    let float = &record.float_metrics;
    ratio(float.total_volume?, float.average_float.filter(|f| *f > Decimal::ZERO)?)
}

/// Pure onchain providers without any offchain indicator are left to the onchain analysis.
fn is_scorable(record: &MarketRecord) -> bool {
    if record.provider_type != ProviderType::Onchain {
        return true;
    }
    let tx = &record.transaction_metrics;
    let agents = &record.agent_network;
    tx.attempted.is_some() || agents.total.is_some() || float_turnover(record).is_some()
}

/// A stateless calculator for the four-dimension efficiency score.
#[derive(Debug, Clone, Default)]
pub struct EfficiencyAnalyzer {
    config: EfficiencyConfig,
}

impl EfficiencyAnalyzer {
    pub fn new(config: EfficiencyConfig) -> Self {
        Self { config }
    }

    /// The main entry point for the efficiency analysis.
    ///
    /// # Arguments
    ///
    /// * `records` - The normalized markets. Markets lacking data are still scored,
    ///   with the fallbacks recorded in their annotations.
    ///
    /// # Returns
    ///
    /// An `EfficiencyReport`, or `EfficiencyError::NoRecords` for an empty slice.
    pub fn analyze(&self, records: &[MarketRecord]) -> Result<EfficiencyReport, EfficiencyError> {
        if records.is_empty() {
            return Err(EfficiencyError::NoRecords);
        }

        let mut report = EfficiencyReport::new();
        let (indices, scorable): (Vec<usize>, Vec<&MarketRecord>) = records
            .iter()
            .enumerate()
            .filter(|(_, r)| is_scorable(r))
            .unzip();
        if scorable.is_empty() {
            tracing::warn!("No market carries offchain metrics; efficiency analysis skipped.");
            report.warnings.push(AnalysisWarning::insufficient_data(
                "efficiency",
                "no market carries offchain efficiency metrics",
            ));
            return Ok(report);
        }

        let financial = self.financial_dimension(&scorable);
        for ((record, index), financial) in scorable.into_iter().zip(indices).zip(financial) {
            let market = self.score_market(record, index, financial, &mut report.warnings);
            tracing::debug!(
                market = %market.market_name,
                score = %market.composite_score,
                grade = %market.grade,
                "Market efficiency scored."
            );
            report.markets.push(market);
        }

        report.aggregate = aggregate(&report.markets);
        report.regional = regional::compare_regions(&report.markets);
        report.disparities = regional::disparities(&report.regional);
        report.insights = regional::generate_insights(
            &report.markets,
            report.aggregate.as_ref(),
            &report.disparities,
            self.config.regional_gap_threshold,
        );

        tracing::info!(
            markets = report.markets.len(),
            mean_score = %report.aggregate.as_ref().map(|a| a.mean_score).unwrap_or_default(),
            "Liquidity efficiency analysis complete."
        );
        Ok(report)
    }

    /// Clipped float turnover, min-max scaled across markets.
    ///
    /// When every market has the same clipped turnover the scale is degenerate and
    /// `clipped / cap` is used instead.
    fn financial_dimension(&self, records: &[&MarketRecord]) -> Vec<Option<Decimal>> {
        let cap = self.config.turnover_cap;
        let clipped: Vec<Option<Decimal>> = records
            .iter()
            .map(|r| float_turnover(r).map(|t| t.max(Decimal::ZERO).min(cap)))
            .collect();

        let Some((min, max)) = find_min_max(clipped.iter().flatten().copied()) else {
            return clipped;
        };
        clipped
            .into_iter()
            .map(|c| c.map(|c| min_max_scale(c, min, max).unwrap_or(c / cap)))
            .collect()
    }

    fn score_market(
        &self,
        record: &MarketRecord,
        record_index: usize,
        financial: Option<Decimal>,
        warnings: &mut Vec<AnalysisWarning>,
    ) -> MarketEfficiency {
        let mut annotations = Vec::new();
        let tx = &record.transaction_metrics;

        // --- Operational ---
        let attempted = tx.attempted.filter(|a| *a > 0).map(Decimal::from);
        let operational = match (attempted, tx.successful) {
            (Some(attempted), Some(successful)) => {
                let successful = Decimal::from(successful);
                if successful > attempted {
                    warnings.push(AnalysisWarning::insufficient_data(
                        record.market_name.clone(),
                        "successful exceeds attempted, success rate capped at 1",
                    ));
                }
                clamp_unit(successful / attempted)
            }
            _ => {
                annotations.push("no attempted transactions, operational dimension 0".to_string());
                Decimal::ZERO
            }
        };
        if tx.is_consistent() == Some(false) {
            annotations.push("successful + failed exceeds attempted".to_string());
        }
        let failure_rate_pct = attempted
            .zip(tx.failed)
            .and_then(|(a, f)| ratio(Decimal::from(f), a))
            .map(|r| r * dec!(100));

        // --- Financial ---
        let financial = financial.unwrap_or_else(|| {
            annotations.push("float turnover unavailable, financial dimension 0".to_string());
            Decimal::ZERO
        });

        // --- Network ---
        let network = network_dimension(&record.agent_network, &mut annotations);

        // --- User ---
        let growth = &record.growth_metrics;
        let user = match (growth.transaction_growth_rate, growth.user_growth_rate) {
            (Some(tx_growth), Some(user_growth)) => clamp_unit(tx_growth - user_growth),
            _ => {
                let substitute = self.config.user_fallback;
                warnings.push(AnalysisWarning::Fallback {
                    market: record.market_name.clone(),
                    field: "growth_metrics".to_string(),
                    substitute,
                });
                annotations.push(format!("growth data missing, neutral user dimension {substitute}"));
                substitute
            }
        };

        let w = &self.config.weights;
        let weighted =
            w.operational * operational + w.financial * financial + w.network * network + w.user * user;
        // Graded before rounding so 89.996 stays below the A band.
        let composite = (weighted * dec!(100)).max(Decimal::ZERO).min(dec!(100));
        let grade = grade_for(composite, &self.config.grade_thresholds);

        let friction = analyze_friction(&record.agent_network, &self.config.friction);
        let agents = &record.agent_network;

        MarketEfficiency {
            market_name: record.market_name.clone(),
            record_index,
            region: record.region.clone(),
            provider_type: record.provider_type,
            success_rate_pct: attempted.map(|_| operational * dec!(100)),
            failure_rate_pct,
            float_turnover: float_turnover(record),
            float_velocity: tx
                .attempted
                .zip(record.float_metrics.average_float)
                .and_then(|(a, f)| ratio(Decimal::from(a), f)),
            agent_utilization_pct: agents
                .total
                .zip(agents.active)
                .and_then(|(t, a)| ratio(Decimal::from(a), Decimal::from(t)))
                .map(|r| r * dec!(100)),
            dimensions: DimensionScores {
                operational,
                financial,
                network,
                user,
            },
            composite_score: composite.round_dp(2),
            grade,
            friction,
            annotations,
        }
    }
}

/// Mean of agent activity (`active / total`) and agent coverage
/// (`(with_liquidity + with_cash) / (2 x active)`), each capped at 1.
fn network_dimension(agents: &AgentNetwork, annotations: &mut Vec<String>) -> Decimal {
    match (agents.total, agents.active) {
        (_, Some(0)) => {
            annotations.push("no active agents".to_string());
            Decimal::ZERO
        }
        (Some(total), Some(active)) if total > 0 => {
            let active = Decimal::from(active);
            let activity = clamp_unit(active / Decimal::from(total));

            if agents.with_liquidity.is_none() || agents.with_cash.is_none() {
                annotations.push("agent coverage counts missing, counted as 0".to_string());
            }
            let covered = Decimal::from(agents.with_liquidity.unwrap_or(0))
                + Decimal::from(agents.with_cash.unwrap_or(0));
            let coverage = clamp_unit(covered / (dec!(2) * active));

            (activity + coverage) / dec!(2)
        }
        _ => {
            annotations.push("agent network data unavailable, network dimension 0".to_string());
            Decimal::ZERO
        }
    }
}

fn aggregate(markets: &[MarketEfficiency]) -> Option<AggregateEfficiency> {
    let (min_score, max_score) = find_min_max(markets.iter().map(|m| m.composite_score))?;
    let mean_score = mean(markets.iter().map(|m| m.composite_score))?.round_dp(2);

    // Ties go to the lexically smallest market name.
    let named_with = |score: Decimal| {
        markets
            .iter()
            .filter(|m| m.composite_score == score)
            .map(|m| m.market_name.as_str())
            .min()
            .map(String::from)
    };

    let mut grade_distribution = BTreeMap::new();
    for market in markets {
        *grade_distribution.entry(market.grade).or_insert(0) += 1;
    }

    Some(AggregateEfficiency {
        mean_score,
        min_score,
        max_score,
        best_market: named_with(max_score)?,
        worst_market: named_with(min_score)?,
        grade_distribution,
    })
}
