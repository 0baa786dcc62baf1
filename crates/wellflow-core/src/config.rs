//! Pipeline definitions: step lists and options, loadable from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bronze::BronzePipeline;
use crate::error::Result;
use crate::options::PipelineOptions;
use crate::pipeline::{Pipeline, StepLibrary};
use crate::silver::{
    SilverPipeline, COLS_TO_ELIM_INVALID_VALUES, COLS_TO_FILTER_MISSING, COLS_TO_IMPUTE_WITH_MEAN,
    COLS_TO_IMPUTE_WITH_MODE, COLS_TO_SORT_BY,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub steps: Vec<String>,
    #[serde(default)]
    pub options: PipelineOptions,
}

impl PipelineDefinition {
    pub fn build<L: StepLibrary>(&self) -> Result<Pipeline<L>> {
        Pipeline::new(self.steps.iter().cloned(), self.options.clone())
    }

    /// Builds with extra options layered over the configured ones.
    pub fn build_with<L: StepLibrary>(
        &self,
        extend: impl FnOnce(&mut PipelineOptions),
    ) -> Result<Pipeline<L>> {
        let mut options = self.options.clone();
        extend(&mut options);
        Pipeline::new(self.steps.iter().cloned(), options)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinesConfig {
    pub bronze: PipelineDefinition,
    pub silver: PipelineDefinition,
}

impl PipelinesConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn bronze_pipeline(&self) -> Result<BronzePipeline> {
        self.bronze.build()
    }

    pub fn silver_pipeline(&self) -> Result<SilverPipeline> {
        self.silver.build()
    }
}

const CATEGORICAL_COLUMNS: [&str; 6] = ["direction", "welltype", "basin", "subbasin", "state", "county"];
const MEASURED_COLUMNS: [&str; 4] = ["spuddate", "cum12moil", "cum12mgas", "cum12mwater"];

impl Default for PipelinesConfig {
    fn default() -> Self {
        let bronze = PipelineDefinition {
            steps: [
                "serialize_rows",
                "add_source_name",
                "add_source_uri",
                "add_row_number",
                "add_source_updated_at",
                "add_id",
            ]
            .map(String::from)
            .to_vec(),
            options: PipelineOptions::new().with("skiprows", 1),
        };

        let eliminate: Vec<&str> = CATEGORICAL_COLUMNS
            .iter()
            .chain(MEASURED_COLUMNS.iter())
            .copied()
            .collect();
        let silver = PipelineDefinition {
            steps: [
                "parse_json",
                "filter_missing",
                "eliminate_invalid_values",
                "impute_with_mean",
                "impute_with_mode",
                "sort",
            ]
            .map(String::from)
            .to_vec(),
            options: PipelineOptions::new()
                .with(COLS_TO_FILTER_MISSING, vec!["api10"])
                .with(COLS_TO_ELIM_INVALID_VALUES, eliminate)
                .with(COLS_TO_IMPUTE_WITH_MEAN, MEASURED_COLUMNS.to_vec())
                .with(COLS_TO_IMPUTE_WITH_MODE, CATEGORICAL_COLUMNS.to_vec())
                .with(COLS_TO_SORT_BY, vec!["api10"]),
        };

        Self { bronze, silver }
    }
}
