use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    /// A record lacks an identity field. Fatal: the whole run is aborted.
    #[error("Malformed input: record #{index} is missing required field '{field}'")]
    MalformedInput { index: usize, field: &'static str },

    #[error("Unsupported input document: {0}")]
    InvalidDocument(String),
}
