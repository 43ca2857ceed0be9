//! Small numeric helpers shared by the analyzers.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

/// Finds the min and max of a set of values. `None` for an empty set.
pub fn find_min_max<I>(values: I) -> Option<(Decimal, Decimal)>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().fold(None, |acc, val| match acc {
        None => Some((val, val)),
        Some((min, max)) => Some((min.min(val), max.max(val))),
    })
}

/// Normalizes a value to a 0.0-1.0 scale.
///
/// Returns `None` when `min == max`; the caller picks the degenerate-case value.
pub fn min_max_scale(value: Decimal, min: Decimal, max: Decimal) -> Option<Decimal> {
    if min == max {
        return None;
    }
    Some(clamp_unit((value - min) / (max - min)))
}

/// `numerator / denominator`, or `None` if the denominator is zero or the quotient
/// does not fit in a `Decimal`.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    numerator.checked_div(denominator)
}

/// Sums values, saturating at `Decimal::MAX` (or `MIN`) instead of overflowing.
pub fn saturating_sum<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .fold(Decimal::ZERO, |sum, value| sum.saturating_add(value))
}

pub fn clamp_unit(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE)
}

pub fn mean<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let (sum, count) = values
        .into_iter()
        .fold((Decimal::ZERO, 0u32), |(sum, count), v| (sum.saturating_add(v), count + 1));
    ratio(sum, Decimal::from(count))
}

/// Median of a set of values (mean of the two middle values for even counts).
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        let (low, high) = (sorted[mid - 1], sorted[mid]);
        Some(
            low.checked_add(high)
                .map(|sum| sum / dec!(2))
                .unwrap_or_else(|| low / dec!(2) + high / dec!(2)),
        )
    } else {
        Some(sorted[mid])
    }
}

/// `ln(1 + x)` for non-negative `x`; negative inputs are treated as zero.
pub fn log_scale(value: Decimal) -> Decimal {
    Decimal::ONE.saturating_add(value.max(Decimal::ZERO)).ln()
}

/// Reads a rate that may be given either as a fraction (0.985) or a percentage (98.5).
pub fn as_fraction(rate: Decimal) -> Decimal {
    if rate > Decimal::ONE {
        clamp_unit(rate / dec!(100))
    } else {
        clamp_unit(rate)
    }
}
