//! Error type shared by the loader, cleaning pipeline and analyzers.
//!
//! Row-level data defects never surface here: they are filtered or nulled and
//! reported through discard tallies. Only wiring bugs (schema mismatch, bad
//! parameters) and I/O failures become errors.

use thiserror::Error;

use crate::cleaning::types::DatasetKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{dataset} dataset is missing required column `{column}`")]
    MissingColumn { dataset: DatasetKind, column: String },

    #[error("expected a {expected} dataset, got {found}")]
    WrongDatasetKind {
        expected: DatasetKind,
        found: DatasetKind,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PipelineError {
    pub fn missing_column(dataset: DatasetKind, column: impl Into<String>) -> Self {
        PipelineError::MissingColumn {
            dataset,
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
