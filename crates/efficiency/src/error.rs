use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EfficiencyError {
    #[error("Not enough data to measure efficiency: no market records were given")]
    NoRecords,
}
