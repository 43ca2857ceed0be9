//! # Liquidity Research Normalizer
//!
//! The single boundary where loosely-typed market data becomes `MarketRecord`s.
//!
//! ## Architectural Principles
//!
//! - **Validate Once:** Numeric text is cleaned, checked and scored here. Downstream
//!   analyzers never see raw strings.
//! - **Soft Failures:** A bad field becomes `None` plus an `AnalysisWarning`; only a
//!   record without identity aborts the batch.
//!
//! ## Public API
//!
//! - `DataNormalizer`: turns `RawRecord`s into a `NormalizedBatch`.
//! - `document::extract_records`: reads the supported input document layouts.
//! - `NumericParser`: the unit-aware number extraction, usable on its own.

pub mod document;
pub mod error;
pub mod normalizer;
pub mod outliers;
pub mod parse;
pub mod quality;

pub use document::extract_records;
pub use error::NormalizeError;
pub use normalizer::{DataNormalizer, NormalizedBatch, RawRecord, UNKNOWN_REGION};
pub use parse::{NumericParser, ParseIssue, ParsedValue};
