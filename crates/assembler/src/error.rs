use efficiency::EfficiencyError;
use normalizer::NormalizeError;
use sourcing::SourcingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("No usable records: normalization produced an empty batch")]
    NoUsableRecords,

    #[error("Sourcing analysis failed: {0}")]
    Sourcing(#[from] SourcingError),

    #[error("Efficiency analysis failed: {0}")]
    Efficiency(#[from] EfficiencyError),
}
