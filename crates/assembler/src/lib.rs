//! # Liquidity Research Report Assembler
//!
//! Drives the analysis crates in a fixed order and combines their output into a
//! single `AnalysisReport` ready to be serialized.
//!
//! ## Architectural Principles
//!
//! - **Fixed Order:** Normalizer, sourcing, efficiency, then onchain when any record
//!   carries onchain data. Each runs exactly once per pipeline run.
//! - **Deterministic Output:** Every collection is ordered and the timestamp is an
//!   input to `assemble`, so the same data and timestamp always serialize to the
//!   same bytes.
//!
//! ## Public API
//!
//! - `ResearchPipeline`: the entry point for a run over raw records or a document.
//! - `assemble`: the pure combination step.
//! - `AnalysisReport`: the final artifact, with `to_value` and `sections` views.

pub mod error;
pub mod insights;
pub mod pipeline;
pub mod report;

pub use error::PipelineError;
pub use pipeline::{ResearchPipeline, assemble};
pub use report::{
    AnalysisReport, Conclusions, METHODOLOGY_VERSION, Methodology, ReportMetadata,
};
