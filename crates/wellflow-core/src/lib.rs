//! Bronze/silver pipelines for well-record extracts.

pub mod bronze;
pub mod config;
pub mod contract;
pub mod error;
pub mod json;
pub mod normalization;
pub mod options;
pub mod outputs;
pub mod pipeline;
pub mod silver;

pub use bronze::{BronzePipeline, BronzeSteps, Provenance};
pub use config::{PipelineDefinition, PipelinesConfig};
pub use contract::StepContract;
pub use error::{PipelineError, Result};
pub use normalization::{NormalizationRule, NormalizedValue};
pub use options::{OptionValue, PipelineOptions};
pub use pipeline::{Pipeline, StepDefinition, StepFn, StepLibrary};
pub use silver::{SilverPipeline, SilverSteps};
