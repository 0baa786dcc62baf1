//! Bronze tier: raw rows serialized opaquely and decorated with provenance.

use polars::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::contract::StepContract;
use crate::error::{PipelineError, Result};
use crate::json::{row_to_json, to_spaced_string};
use crate::options::{OptionValue, PipelineOptions};
use crate::pipeline::{Pipeline, StepDefinition, StepLibrary};

pub const SOURCE_ROW: &str = "source_row";
pub const SOURCE_ROW_NUMBER: &str = "source_row_number";
pub const ID: &str = "id";

#[derive(Debug, Clone, Copy)]
pub struct BronzeSteps;

pub type BronzePipeline = Pipeline<BronzeSteps>;

static BRONZE_STEPS: &[StepDefinition] = &[
    StepDefinition {
        name: "serialize_rows",
        contract: StepContract::NONE,
        apply: serialize_rows,
    },
    StepDefinition {
        name: "add_source_name",
        contract: StepContract::options(&["source_name"]),
        apply: add_source_name,
    },
    StepDefinition {
        name: "add_source_uri",
        contract: StepContract::options(&["source_uri"]),
        apply: add_source_uri,
    },
    StepDefinition {
        name: "add_source_updated_at",
        contract: StepContract::options(&["source_updated_at"]),
        apply: add_source_updated_at,
    },
    StepDefinition {
        name: "add_source_created_at",
        contract: StepContract::options(&["source_created_at"]),
        apply: add_source_created_at,
    },
    StepDefinition {
        name: "add_row_number",
        contract: StepContract::options(&["skiprows"]),
        apply: add_row_number,
    },
    StepDefinition {
        name: "add_id",
        contract: StepContract::NONE,
        apply: add_id,
    },
];

impl StepLibrary for BronzeSteps {
    const TIER: &'static str = "bronze";

    fn registry() -> &'static [StepDefinition] {
        BRONZE_STEPS
    }
}

/// Replaces every column with a single `source_row` JSON object per row.
fn serialize_rows(_options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    let mut rows: Vec<String> = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let object = row_to_json(&df, idx)?;
        rows.push(to_spaced_string(&Value::Object(object))?);
    }

    let serialized = Series::new(SOURCE_ROW.into(), rows);
    Ok(DataFrame::new(vec![serialized.into()])?)
}

fn add_source_name(options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    add_constant(options, df, "add_source_name", "source_name")
}

fn add_source_uri(options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    add_constant(options, df, "add_source_uri", "source_uri")
}

fn add_source_updated_at(options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    add_constant(options, df, "add_source_updated_at", "source_updated_at")
}

fn add_source_created_at(options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    add_constant(options, df, "add_source_created_at", "source_created_at")
}

/// Offsets the positional index by `skiprows` so numbers line up with the
/// source file, which may carry header rows that were skipped upstream.
fn add_row_number(options: &PipelineOptions, mut df: DataFrame) -> Result<DataFrame> {
    let skiprows = options.integer("add_row_number", "skiprows")?;
    let numbers: Vec<i64> = (0..df.height() as i64).map(|idx| idx + skiprows).collect();
    df.with_column(Series::new(SOURCE_ROW_NUMBER.into(), numbers))?;
    Ok(df)
}

fn add_id(_options: &PipelineOptions, mut df: DataFrame) -> Result<DataFrame> {
    let ids: Vec<String> = (0..df.height())
        .map(|_| Uuid::new_v4().to_string())
        .collect();
    df.with_column(Series::new(ID.into(), ids))?;
    Ok(df)
}

fn add_constant(
    options: &PipelineOptions,
    mut df: DataFrame,
    step: &str,
    key: &str,
) -> Result<DataFrame> {
    let height = df.height();
    let series = match options.value(step, key)? {
        OptionValue::Text(text) => Series::new(key.into(), vec![text.as_str(); height]),
        OptionValue::Integer(value) => Series::new(key.into(), vec![*value; height]),
        OptionValue::Timestamp(ts) => Series::new(key.into(), vec![ts.timestamp_micros(); height])
            .cast(&DataType::Datetime(
                TimeUnit::Microseconds,
                Some(polars::prelude::TimeZone::UTC),
            ))?,
        OptionValue::Columns(_) => {
            return Err(PipelineError::InvalidOption {
                step: step.to_string(),
                key: key.to_string(),
                expected: "a scalar value",
            })
        }
    };
    df.with_column(series)?;
    Ok(df)
}

/// Read-only facts about where a raw extract came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub source_filename: String,
    pub source_uri: String,
    pub source_created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub source_updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Provenance {
    /// Adds the provenance keys the `add_source_*` steps read. Timestamps the
    /// source could not report are left out.
    pub fn apply_to(&self, options: &mut PipelineOptions) {
        options.insert("source_name", self.source_filename.as_str());
        options.insert("source_uri", self.source_uri.as_str());
        if let Some(created) = self.source_created_at {
            options.insert("source_created_at", created);
        }
        if let Some(updated) = self.source_updated_at {
            options.insert("source_updated_at", updated);
        }
    }
}
