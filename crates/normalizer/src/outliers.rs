use core_types::scale::{median, ratio};
use core_types::{AnalysisWarning, MarketRecord, OutlierFlag};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The values of a record that are compared against the cross-market median.
fn monitored_values(record: &MarketRecord) -> Vec<(String, Decimal)> {
    let mut values: Vec<(String, Decimal)> = record
        .liquidity_sources
        .iter()
        .map(|(source, volume)| (format!("liquidity_sources.{source}"), *volume))
        .collect();

    let scalars = [
        ("float_metrics.total_volume", record.float_metrics.total_volume),
        ("float_metrics.average_float", record.float_metrics.average_float),
        (
            "transaction_metrics.attempted",
            record.transaction_metrics.attempted.map(Decimal::from),
        ),
        ("agent_network.total", record.agent_network.total.map(Decimal::from)),
    ];
    values.extend(
        scalars
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field.to_string(), v))),
    );
    values
}

/// Flags every value above `multiplier` x its field's cross-market median.
///
/// Flagged values stay in the record and keep participating in aggregates; the flag
/// is attached to the record and mirrored as a warning.
pub fn flag_outliers(
    records: &mut [MarketRecord],
    multiplier: Decimal,
    warnings: &mut Vec<AnalysisWarning>,
) {
    let mut by_field: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for record in records.iter() {
        for (field, value) in monitored_values(record) {
            by_field.entry(field).or_default().push(value);
        }
    }

    let medians: BTreeMap<String, Decimal> = by_field
        .into_iter()
        .filter_map(|(field, values)| median(&values).map(|m| (field, m)))
        .collect();

    for record in records.iter_mut() {
        for (field, value) in monitored_values(record) {
            let Some(&median) = medians.get(&field) else {
                continue;
            };
            if median <= Decimal::ZERO {
                continue;
            }
            // A limit beyond the Decimal range cannot be exceeded.
            match median.checked_mul(multiplier) {
                Some(limit) if value > limit => {}
                _ => continue,
            }

            let multiple = ratio(value, median).unwrap_or(Decimal::MAX).round_dp(2);
            tracing::debug!(market = %record.market_name, %field, %value, %median, "Outlier flagged.");
            record
                .annotations
                .push(format!("outlier: {field} is {multiple}x the cross-market median"));
            warnings.push(AnalysisWarning::Outlier {
                market: record.market_name.clone(),
                field: field.clone(),
                value,
                median,
                ratio: multiple,
            });
            record.outliers.push(OutlierFlag {
                field,
                value,
                median,
                ratio: multiple,
            });
        }
    }
}
