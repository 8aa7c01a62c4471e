// Error types shared by the scoring pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConformanceError {
    #[error("Frame {frame} has {found} landmarks, expected 33")]
    InvalidLandmarkCount { frame: usize, found: usize },

    #[error("Length mismatch for {field}: expected {expected}, found {found}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Feature vector has {found} dimensions, expected {expected}")]
    InvalidFeatureDimension { expected: usize, found: usize },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type ConformanceResult<T> = Result<T, ConformanceError>;
