use crate::error::PipelineError;
use crate::insights;
use crate::report::{
    AnalysisReport, METHODOLOGY_NAME, METHODOLOGY_VERSION, REPORT_TITLE, RESEARCH_QUESTIONS,
    ReportMetadata,
};
use chrono::{DateTime, Utc};
use configuration::ResearchConfig;
use core_types::{AnalysisWarning, MarketRecord};
use efficiency::{EfficiencyAnalyzer, EfficiencyReport};
use normalizer::{DataNormalizer, RawRecord, extract_records};
use onchain::{OnchainAnalyzer, OnchainReport};
use serde_json::Value;
use sourcing::{SourcingAnalyzer, SourcingReport};

/// Combines the component reports into the final `AnalysisReport`.
///
/// Pure: the same inputs and `generated_at` always produce the same report.
/// `warnings` are the normalization warnings; each component report's own
/// warnings are appended after them, in pipeline order.
pub fn assemble(
    sourcing: SourcingReport,
    efficiency: EfficiencyReport,
    onchain: Option<OnchainReport>,
    markets: &[MarketRecord],
    warnings: Vec<AnalysisWarning>,
    generated_at: DateTime<Utc>,
) -> AnalysisReport {
    let mut all_warnings = warnings;
    all_warnings.extend(sourcing.warnings.iter().cloned());
    all_warnings.extend(efficiency.warnings.iter().cloned());
    if let Some(onchain) = &onchain {
        all_warnings.extend(onchain.warnings.iter().cloned());
    }

    let findings = insights::findings(
        markets,
        &sourcing,
        &efficiency,
        onchain.as_ref(),
        &all_warnings,
    );
    let conclusions = insights::conclusions(&sourcing, &efficiency, onchain.as_ref());

    AnalysisReport {
        metadata: ReportMetadata {
            title: REPORT_TITLE.to_string(),
            research_questions: RESEARCH_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            methodology_name: METHODOLOGY_NAME.to_string(),
            methodology_version: METHODOLOGY_VERSION.to_string(),
            generated_at,
            providers_analyzed: markets.len(),
            onchain_included: onchain.is_some(),
        },
        methodology: insights::methodology(onchain.is_some()),
        sourcing_analysis: sourcing,
        efficiency_analysis: efficiency,
        onchain_analysis: onchain,
        findings,
        conclusions,
        warnings: all_warnings,
        markets_analyzed: markets.iter().map(|m| m.market_name.clone()).collect(),
    }
}

/// Runs every analysis once, in a fixed order, over one batch of records.
#[derive(Debug, Clone, Default)]
pub struct ResearchPipeline {
    config: ResearchConfig,
}

impl ResearchPipeline {
    pub fn new(config: ResearchConfig) -> Self {
        Self { config }
    }

    /// Runs the pipeline stamped with the current time.
    pub fn run(&self, raw_records: &[RawRecord]) -> Result<AnalysisReport, PipelineError> {
        self.run_at(raw_records, Utc::now())
    }

    /// Normalizer, sourcing, efficiency, then onchain when any record carries
    /// onchain data.
    ///
    /// # Errors
    ///
    /// * `PipelineError::Normalize` - a record lacks its identity.
    /// * `PipelineError::NoUsableRecords` - the batch is empty after normalization.
    pub fn run_at(
        &self,
        raw_records: &[RawRecord],
        generated_at: DateTime<Utc>,
    ) -> Result<AnalysisReport, PipelineError> {
        tracing::info!(records = raw_records.len(), "Starting research pipeline.");

        let batch = DataNormalizer::new(self.config.normalizer.clone()).normalize(raw_records)?;
        if batch.records.is_empty() {
            return Err(PipelineError::NoUsableRecords);
        }

        let sourcing = SourcingAnalyzer::new().analyze(&batch.records)?;
        let efficiency =
            EfficiencyAnalyzer::new(self.config.efficiency.clone()).analyze(&batch.records)?;
        let onchain =
            OnchainAnalyzer::new(self.config.onchain.clone()).analyze(&batch.records, &efficiency);

        let report = assemble(
            sourcing,
            efficiency,
            onchain,
            &batch.records,
            batch.warnings,
            generated_at,
        );

        tracing::info!(
            markets = report.markets_analyzed.len(),
            warnings = report.warnings.len(),
            onchain = report.onchain_analysis.is_some(),
            "Research pipeline complete."
        );
        Ok(report)
    }

    /// Extracts the records of an input document, then runs the pipeline.
    pub fn run_document(
        &self,
        document: &Value,
        generated_at: DateTime<Utc>,
    ) -> Result<AnalysisReport, PipelineError> {
        let raw_records = extract_records(document)?;
        self.run_at(&raw_records, generated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::ProviderType;

    #[test]
    fn test_assemble_merges_warnings_in_pipeline_order() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let markets = vec![MarketRecord::new("MTN", "Ghana", "West Africa", ProviderType::Offchain)];
        let mut sourcing = SourcingReport::new();
        sourcing
            .warnings
            .push(AnalysisWarning::insufficient_data("sourcing", "no volume"));
        let mut efficiency = EfficiencyReport::new();
        efficiency
            .warnings
            .push(AnalysisWarning::insufficient_data("efficiency", "no metrics"));
        let normalize = vec![AnalysisWarning::insufficient_data("MTN", "no data")];

        let report = assemble(sourcing, efficiency, None, &markets, normalize, at);

        let contexts: Vec<String> = report.warnings.iter().map(|w| w.to_string()).collect();
        assert_eq!(contexts.len(), 3);
        assert!(contexts[0].starts_with("MTN"));
        assert!(contexts[1].starts_with("sourcing"));
        assert!(contexts[2].starts_with("efficiency"));
        assert_eq!(report.metadata.methodology_version, "2.0");
        assert_eq!(report.metadata.generated_at, at);
        assert!(!report.metadata.onchain_included);
        assert_eq!(report.markets_analyzed, vec!["MTN"]);
    }

    #[test]
    fn test_sections_omit_onchain_when_absent() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let report = assemble(
            SourcingReport::new(),
            EfficiencyReport::new(),
            None,
            &[],
            Vec::new(),
            at,
        );
        let sections = report.sections().unwrap();
        let keys: Vec<&str> = sections.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["efficiency", "insights", "metadata", "sourcing"]);
        assert_eq!(
            sections["metadata"]["metadata"]["methodology_name"],
            METHODOLOGY_NAME
        );
        assert!(report.to_value().unwrap()["onchain_analysis"].is_null());
    }
}
