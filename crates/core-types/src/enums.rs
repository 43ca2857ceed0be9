use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a provider's liquidity is held: traditional rails, blockchain rails, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Offchain,
    Onchain,
    Hybrid,
}

impl ProviderType {
    /// Returns true if the provider is expected to carry blockchain metrics.
    pub fn has_onchain_rails(&self) -> bool {
        matches!(self, ProviderType::Onchain | ProviderType::Hybrid)
    }
}

impl FromStr for ProviderType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offchain" | "traditional" => Ok(ProviderType::Offchain),
            "onchain" | "blockchain" => Ok(ProviderType::Onchain),
            "hybrid" => Ok(ProviderType::Hybrid),
            other => Err(CoreError::InvalidInput(
                "provider type".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// The letter grade attached to a composite efficiency score.
///
/// Variants are declared best-first so the derived ordering sorts A before D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(label)
    }
}

/// A class of transactions an agent network is likely to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionKind {
    /// Too few agents hold e-float, so customers cannot withdraw cash.
    CashOutRisk,
    /// Too few agents hold physical cash, so customers cannot deposit.
    CashInRisk,
}

impl fmt::Display for FrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrictionKind::CashOutRisk => f.write_str("cash-out risk"),
            FrictionKind::CashInRisk => f.write_str("cash-in risk"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("Offchain".parse::<ProviderType>().unwrap(), ProviderType::Offchain);
        assert_eq!(" onchain ".parse::<ProviderType>().unwrap(), ProviderType::Onchain);
        assert!("satellite".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_grade_serializes_with_sign() {
        assert_eq!(serde_json::to_string(&Grade::BPlus).unwrap(), "\"B+\"");
        assert_eq!(Grade::BMinus.to_string(), "B-");
        assert!(Grade::A < Grade::D);
    }
}
