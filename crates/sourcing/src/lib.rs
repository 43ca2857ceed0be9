//! # Liquidity Sourcing Analyzer
//!
//! Answers where providers source their liquidity: which source types carry the
//! volume, how concentrated each region is, and how offchain volume compares with
//! onchain value.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** Depends only on `core-types`. Reads normalized records and
//!   returns a fresh report.
//! - **No Division by Zero:** Every share is an `Option` or falls back to zero, and
//!   each undefined figure is mirrored by an `AnalysisWarning`.
//!
//! ## Public API
//!
//! - `SourcingAnalyzer`: the stateless aggregator.
//! - `SourcingReport`: ranked sources, primary source, regional and market breakdowns.
//! - `SourcingError`: returned when there is nothing to analyze.

pub mod analyzer;
pub mod error;
pub mod report;

pub use analyzer::{SourcingAnalyzer, rank_shares};
pub use error::SourcingError;
pub use report::{
    ChannelComparison, MarketSourcing, PrimarySource, RegionalSourcing, SourceShare, SourcingReport,
};
