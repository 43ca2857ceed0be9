//! # Liquidity Efficiency Analyzer
//!
//! Answers how efficiently liquidity is used. Each market is scored on four
//! dimensions (operational, financial, network, user) that are combined into a
//! 0-100 composite and a letter grade.
//!
//! ## Architectural Principles
//!
//! - **Stateless Calculation:** The `EfficiencyAnalyzer` holds only its configuration.
//!   It reads normalized records and returns a fresh `EfficiencyReport`.
//! - **Score Everything:** A market with gaps in its data is still scored. Each
//!   fallback is written to the market's annotations or the report warnings.
//!
//! ## Public API
//!
//! - `EfficiencyAnalyzer`: the scoring engine.
//! - `EfficiencyReport`: per-market scores, aggregates, regional comparison, insights.
//! - `grade_for`: the configurable score-to-grade mapping.
//! - `analyze_friction`: cash-out and cash-in risk of an agent network.

pub mod engine;
pub mod error;
pub mod friction;
pub mod regional;
pub mod report;

pub use engine::{EfficiencyAnalyzer, grade_for};
pub use error::EfficiencyError;
pub use friction::{FrictionAnalysis, analyze_friction};
pub use report::{
    AggregateEfficiency, DimensionScores, EfficiencyInsights, EfficiencyReport, MarketEfficiency,
    RegionalEfficiency, RegionalGap,
};
