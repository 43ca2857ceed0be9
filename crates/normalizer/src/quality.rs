use configuration::NormalizerConfig;
use core_types::scale::{clamp_unit, ratio};
use core_types::{MarketRecord, QualityAssessment};
use rust_decimal::Decimal;

/// Number of fields a complete record carries: 3 identity, liquidity sources,
/// 3 transaction counts, 2 float figures, 4 agent counts.
pub const EXPECTED_FIELDS: u32 = 13;

/// Scores a record's completeness, internal consistency and source reliability.
///
/// `region_given` tells whether the region came from the input rather than the
/// `"Unknown"` placeholder. `soft_issues` is the number of parse problems seen while
/// building the record; each one costs `parse_penalty`.
pub fn assess(
    record: &MarketRecord,
    region_given: bool,
    soft_issues: usize,
    config: &NormalizerConfig,
) -> QualityAssessment {
    let completeness = completeness(record, region_given);
    let consistency = consistency(record);
    let source_reliability = config.reliability_of(record.data_source.as_deref());

    let w = &config.quality_weights;
    let weighted = completeness * w.completeness
        + consistency * w.consistency
        + source_reliability * w.source_reliability;
    let penalty = config.parse_penalty * Decimal::from(soft_issues as u64);

    QualityAssessment {
        score: clamp_unit(weighted - penalty),
        completeness,
        consistency,
        source_reliability,
        penalty,
    }
}

fn completeness(record: &MarketRecord, region_given: bool) -> Decimal {
    let tx = &record.transaction_metrics;
    let float = &record.float_metrics;
    let agents = &record.agent_network;

    // market_name and country are guaranteed by the normalizer.
    let present = [
        true,
        true,
        region_given,
        !record.liquidity_sources.is_empty(),
        tx.attempted.is_some(),
        tx.successful.is_some(),
        tx.failed.is_some(),
        float.total_volume.is_some(),
        float.average_float.is_some(),
        agents.total.is_some(),
        agents.active.is_some(),
        agents.with_liquidity.is_some(),
        agents.with_cash.is_some(),
    ]
    .into_iter()
    .filter(|p| *p)
    .count();

    Decimal::from(present as u64) / Decimal::from(EXPECTED_FIELDS)
}

/// Fraction of the checkable cross-field invariants that hold; 1 when none can be checked.
fn consistency(record: &MarketRecord) -> Decimal {
    let mut checks: Vec<bool> = record
        .agent_network
        .bound_checks()
        .into_iter()
        .map(|(_, holds)| holds)
        .collect();
    if let Some(holds) = record.transaction_metrics.is_consistent() {
        checks.push(holds);
    }

    let held = checks.iter().filter(|h| **h).count();
    ratio(Decimal::from(held as u64), Decimal::from(checks.len() as u64))
        .unwrap_or(Decimal::ONE)
}
