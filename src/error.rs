//! Error types for the scoring engine.

use thiserror::Error;

use crate::models::SliceKey;

pub type Result<T> = std::result::Result<T, ScoringError>;

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("slice {key} failed: {source}")]
    Slice {
        key: SliceKey,
        #[source]
        source: Box<ScoringError>,
    },
}

impl ScoringError {
    pub fn in_slice(self, key: &SliceKey) -> Self {
        match self {
            ScoringError::Slice { .. } => self,
            other => ScoringError::Slice {
                key: key.clone(),
                source: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::Configuration(_) => "configuration",
            ScoringError::InsufficientHistory(_) => "insufficient_history",
            ScoringError::InvalidInput(_) => "invalid_input",
            ScoringError::Slice { source, .. } => source.kind(),
        }
    }
}
