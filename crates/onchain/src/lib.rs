//! # Onchain Liquidity Analyzer
//!
//! Scores blockchain adoption, DeFi integration, cross-chain bridges and smart
//! contract performance for every market that carries onchain data, then blends
//! the result with the offchain efficiency score.
//!
//! ## Architectural Principles
//!
//! - **Optional by Nature:** The presence of an onchain section is the only trigger.
//!   Without one, `OnchainAnalyzer::analyze` returns `None` and nothing else changes.
//! - **Neutral Fallbacks:** A missing sub-field contributes a neutral value and is
//!   listed in the market's `missing_fields`.
//!
//! ## Public API
//!
//! - `OnchainAnalyzer`: the scoring engine.
//! - `OnchainReport`: sub-scores, onchain and hybrid scores, and insights.

pub mod engine;
pub mod report;
pub mod subscores;

pub use engine::OnchainAnalyzer;
pub use report::{
    BlockchainAdoption, MarketOnchain, MissingField, OnchainInsights, OnchainReport,
    OnchainSubscores,
};
