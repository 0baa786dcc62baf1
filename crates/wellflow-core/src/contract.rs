use polars::prelude::DataFrame;

use crate::error::{PipelineError, Result};
use crate::options::PipelineOptions;

/// Preconditions a step declares about the table and options it runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepContract {
    pub required_columns: &'static [&'static str],
    pub required_options: &'static [&'static str],
}

impl StepContract {
    pub const NONE: StepContract = StepContract {
        required_columns: &[],
        required_options: &[],
    };

    pub const fn columns(required_columns: &'static [&'static str]) -> Self {
        Self {
            required_columns,
            required_options: &[],
        }
    }

    pub const fn options(required_options: &'static [&'static str]) -> Self {
        Self {
            required_columns: &[],
            required_options,
        }
    }

    /// Checks the contract against the current table, columns first.
    pub fn check(&self, step: &str, df: &DataFrame, options: &PipelineOptions) -> Result<()> {
        let missing_columns: Vec<String> = self
            .required_columns
            .iter()
            .filter(|name| df.column(name).is_err())
            .map(|name| name.to_string())
            .collect();
        if !missing_columns.is_empty() {
            return Err(PipelineError::MissingColumns {
                step: step.to_string(),
                missing: missing_columns,
            });
        }

        let missing_options: Vec<String> = self
            .required_options
            .iter()
            .filter(|key| !options.contains(key))
            .map(|key| key.to_string())
            .collect();
        if !missing_options.is_empty() {
            return Err(PipelineError::MissingOptions {
                step: step.to_string(),
                missing: missing_options,
            });
        }

        Ok(())
    }
}
