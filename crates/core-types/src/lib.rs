//! # Liquidity Research Core Types
//!
//! The shared vocabulary of the research workspace. Every analyzer crate speaks in
//! terms of the types defined here.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate has no knowledge of configuration, parsing or reporting.
//!   It only defines data and a handful of pure numeric helpers.
//! - **Validated Once:** A `MarketRecord` is produced by the normalizer and is read-only
//!   afterwards. Fields that could not be parsed are `None`, never a sentinel.
//!
//! ## Public API
//!
//! - `MarketRecord` and its metric groups: the strongly-typed market under study.
//! - `AnalysisWarning`: the soft issues accumulated across the pipeline.
//! - `scale`: min-max, median and ratio helpers shared by the analyzers.

pub mod enums;
pub mod error;
pub mod market;
pub mod scale;
pub mod warning;

// Re-export the core types to provide a clean public API.
pub use enums::{FrictionKind, Grade, ProviderType};
pub use error::CoreError;
pub use market::{
    AgentNetwork, FieldProvenance, FloatMetrics, GrowthMetrics, MarketRecord, OnchainSection,
    OutlierFlag, QualityAssessment, TransactionMetrics,
};
pub use warning::AnalysisWarning;
