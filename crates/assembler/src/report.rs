use chrono::{DateTime, Utc};
use core_types::AnalysisWarning;
use efficiency::EfficiencyReport;
use onchain::OnchainReport;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sourcing::SourcingReport;
use std::collections::BTreeMap;

pub const REPORT_TITLE: &str = "African Liquidity Markets: Sourcing Patterns and Efficiency";
pub const METHODOLOGY_NAME: &str = "LAVA Liquidity Research Methodology";
pub const METHODOLOGY_VERSION: &str = "2.0";

/// The questions every report sets out to answer.
pub const RESEARCH_QUESTIONS: [&str; 3] = [
    "Where do mobile money and digital payment providers source their liquidity?",
    "How efficiently is that liquidity used across markets and regions?",
    "How does onchain liquidity change the picture?",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub title: String,
    pub research_questions: Vec<String>,
    pub methodology_name: String,
    pub methodology_version: String,
    pub generated_at: DateTime<Utc>,
    pub providers_analyzed: usize,
    pub onchain_included: bool,
}

/// How each analysis was carried out, in prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Methodology {
    pub data_normalization: String,
    pub liquidity_sourcing: String,
    pub efficiency_measurement: String,
    /// Absent when no market carried onchain data.
    pub onchain_integration: Option<String>,
}

/// Structured insights, one list per analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conclusions {
    pub sourcing: Vec<String>,
    pub efficiency: Vec<String>,
    pub onchain: Vec<String>,
}

/// The final research artifact of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub methodology: Methodology,
    pub sourcing_analysis: SourcingReport,
    pub efficiency_analysis: EfficiencyReport,
    pub onchain_analysis: Option<OnchainReport>,
    pub findings: Vec<String>,
    pub conclusions: Conclusions,
    /// Every warning of the run: normalization first, then each analysis in order.
    pub warnings: Vec<AnalysisWarning>,
    /// Market names in input order.
    pub markets_analyzed: Vec<String>,
}

impl AnalysisReport {
    /// The whole report as one nested JSON value.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// One value per report sheet, keyed `metadata`, `sourcing`, `efficiency`,
    /// `onchain` and `insights`. The `onchain` sheet is only present when the
    /// onchain analysis ran.
    pub fn sections(&self) -> serde_json::Result<BTreeMap<String, Value>> {
        let mut sections = BTreeMap::new();
        sections.insert(
            "metadata".to_string(),
            json!({
                "metadata": serde_json::to_value(&self.metadata)?,
                "methodology": serde_json::to_value(&self.methodology)?,
                "markets_analyzed": self.markets_analyzed,
            }),
        );
        sections.insert(
            "sourcing".to_string(),
            serde_json::to_value(&self.sourcing_analysis)?,
        );
        sections.insert(
            "efficiency".to_string(),
            serde_json::to_value(&self.efficiency_analysis)?,
        );
        if let Some(onchain) = &self.onchain_analysis {
            sections.insert("onchain".to_string(), serde_json::to_value(onchain)?);
        }
        sections.insert(
            "insights".to_string(),
            json!({
                "findings": self.findings,
                "conclusions": serde_json::to_value(&self.conclusions)?,
                "warnings": serde_json::to_value(&self.warnings)?,
            }),
        );
        Ok(sections)
    }
}
