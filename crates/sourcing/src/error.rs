use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SourcingError {
    #[error("Not enough data to analyze liquidity sourcing: no market records were given")]
    NoRecords,
}
