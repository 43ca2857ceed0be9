use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A soft issue found while analyzing a batch of markets.
///
/// None of these abort a run. They are collected by each component and surfaced in
/// the final report so nothing is silently dropped.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// A single field failed numeric extraction and was kept as null.
    #[error("{market}: field '{field}' could not be parsed ({reason})")]
    FieldParse {
        market: String,
        field: String,
        reason: String,
    },

    /// A textual value carried a unit missing from the multiplier table.
    #[error("{market}: field '{field}' has unknown unit '{unit}', multiplier 1 assumed")]
    UnknownUnit {
        market: String,
        field: String,
        unit: String,
    },

    /// A ratio, ranking or invariant could not be computed or does not hold.
    #[error("{context}: insufficient data ({reason})")]
    InsufficientData { context: String, reason: String },

    /// A value is more than the configured multiple of its cross-market median.
    #[error("{market}: '{field}' = {value} is {ratio}x the cross-market median {median}")]
    Outlier {
        market: String,
        field: String,
        value: Decimal,
        median: Decimal,
        ratio: Decimal,
    },

    /// A missing input was replaced by a neutral value.
    #[error("{market}: '{field}' missing, neutral value {substitute} used")]
    Fallback {
        market: String,
        field: String,
        substitute: Decimal,
    },
}

impl AnalysisWarning {
    pub fn insufficient_data(context: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisWarning::InsufficientData {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly label of the warning class.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisWarning::FieldParse { .. } => "field_parse",
            AnalysisWarning::UnknownUnit { .. } => "unknown_unit",
            AnalysisWarning::InsufficientData { .. } => "insufficient_data",
            AnalysisWarning::Outlier { .. } => "outlier",
            AnalysisWarning::Fallback { .. } => "fallback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_warning_display_and_tag() {
        let warning = AnalysisWarning::Fallback {
            market: "M-Pesa".to_string(),
            field: "defi_integration.average_apy_percentage".to_string(),
            substitute: dec!(0.5),
        };
        assert_eq!(
            warning.to_string(),
            "M-Pesa: 'defi_integration.average_apy_percentage' missing, neutral value 0.5 used"
        );
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "fallback");
        assert_eq!(warning.kind(), "fallback");
    }
}
