//! Pipeline error types

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("missing {stage} data at {path}; run the producing step first")]
    MissingInput { stage: &'static str, path: PathBuf },

    #[error("insufficient training data: {available} labeled samples, need {required}")]
    InsufficientData { required: usize, available: usize },

    #[error("feature schema mismatch: pipeline expects [{expected}], artifact has [{found}]")]
    SchemaMismatch { expected: String, found: String },

    #[error("no trained model for '{0}'; run train first or use the train-if-missing policy")]
    ModelNotTrained(String),

    #[error("bet automation error: {0}")]
    Automation(String),
}

impl PipelineError {
    /// True when the error means an upstream stage never produced its file.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, PipelineError::MissingInput { .. })
    }
}
