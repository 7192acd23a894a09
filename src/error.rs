//! Error types for the block profit pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BlockProfitError>;

/// Main error type for training, persistence and inference
#[derive(Error, Debug)]
pub enum BlockProfitError {
    #[error("Dataset not found: {}", .0.display())]
    DatasetMissing(PathBuf),

    #[error("Malformed dataset: {0}")]
    DatasetMalformed(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Model artifact at {} is unreadable: {reason}", .path.display())]
    ArtifactUnreadable { path: PathBuf, reason: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for BlockProfitError {
    fn from(err: polars::error::PolarsError) -> Self {
        BlockProfitError::DatasetMalformed(err.to_string())
    }
}

impl From<serde_json::Error> for BlockProfitError {
    fn from(err: serde_json::Error) -> Self {
        BlockProfitError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BlockProfitError {
    fn from(err: ndarray::ShapeError) -> Self {
        BlockProfitError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BlockProfitError::DatasetMalformed("empty file".to_string());
        assert_eq!(err.to_string(), "Malformed dataset: empty file");
    }

    #[test]
    fn test_missing_columns_lists_names() {
        let err = BlockProfitError::MissingColumns(vec!["Tonnage".into(), "Rock_Type".into()]);
        assert_eq!(err.to_string(), "Missing required columns: Tonnage, Rock_Type");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BlockProfitError = io_err.into();
        assert!(matches!(err, BlockProfitError::IoError(_)));
    }
}
