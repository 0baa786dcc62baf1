// crates/wellflow-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{tier} pipeline has no step named '{step}'")]
    UnknownStep { tier: &'static str, step: String },

    #[error("step '{step}' is missing required columns: {}", missing.join(", "))]
    MissingColumns { step: String, missing: Vec<String> },

    #[error("step '{step}' is missing required options: {}", missing.join(", "))]
    MissingOptions { step: String, missing: Vec<String> },

    #[error("step '{step}' expected option '{key}' to be {expected}")]
    InvalidOption {
        step: String,
        key: String,
        expected: &'static str,
    },

    #[error("source row {row} is malformed: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline config is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
