//! Silver tier: parsed, filtered, normalized, imputed and sorted well records.

use std::collections::HashMap;

use chrono::Utc;
use polars::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::bronze::{ID, SOURCE_ROW};
use crate::contract::StepContract;
use crate::error::{PipelineError, Result};
use crate::json::{flatten_object, objects_to_columns};
use crate::normalization::NormalizationRule;
use crate::options::PipelineOptions;
use crate::pipeline::{Pipeline, StepDefinition, StepLibrary};

pub const COLS_TO_FILTER_MISSING: &str = "cols_to_filter_missing";
pub const COLS_TO_ELIM_INVALID_VALUES: &str = "cols_to_elim_invalid_values";
pub const COLS_TO_IMPUTE_WITH_MEAN: &str = "cols_to_impute_with_mean";
pub const COLS_TO_IMPUTE_WITH_MODE: &str = "cols_to_impute_with_mode";
pub const COLS_TO_SORT_BY: &str = "cols_to_sort_by";

#[derive(Debug, Clone, Copy)]
pub struct SilverSteps;

pub type SilverPipeline = Pipeline<SilverSteps>;

static SILVER_STEPS: &[StepDefinition] = &[
    StepDefinition {
        name: "parse_json",
        contract: StepContract::columns(&[SOURCE_ROW]),
        apply: parse_json,
    },
    StepDefinition {
        name: "filter_missing",
        contract: StepContract::options(&[COLS_TO_FILTER_MISSING]),
        apply: filter_missing,
    },
    StepDefinition {
        name: "eliminate_invalid_values",
        contract: StepContract::options(&[COLS_TO_ELIM_INVALID_VALUES]),
        apply: eliminate_invalid_values,
    },
    StepDefinition {
        name: "impute_with_mean",
        contract: StepContract::options(&[COLS_TO_IMPUTE_WITH_MEAN]),
        apply: impute_with_mean,
    },
    StepDefinition {
        name: "impute_with_mode",
        contract: StepContract::options(&[COLS_TO_IMPUTE_WITH_MODE]),
        apply: impute_with_mode,
    },
    StepDefinition {
        name: "sort",
        contract: StepContract::options(&[COLS_TO_SORT_BY]),
        apply: sort,
    },
];

impl StepLibrary for SilverSteps {
    const TIER: &'static str = "silver";

    fn registry() -> &'static [StepDefinition] {
        SILVER_STEPS
    }

    /// Every column configured for elimination must have a rule.
    fn validate_options(options: &PipelineOptions) -> Result<()> {
        if !options.contains(COLS_TO_ELIM_INVALID_VALUES) {
            return Ok(());
        }
        for column in options.columns("eliminate_invalid_values", COLS_TO_ELIM_INVALID_VALUES)? {
            NormalizationRule::for_column(column)?;
        }
        Ok(())
    }
}

fn require_columns(step: &str, df: &DataFrame, columns: &[String]) -> Result<()> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|name| df.column(name).is_err())
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns {
            step: step.to_string(),
            missing,
        })
    }
}

/// Expands `source_row` back into columns. Only `id` survives from the input.
fn parse_json(_options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    let source = df.column(SOURCE_ROW)?.str()?;

    let mut rows: Vec<Map<String, Value>> = Vec::with_capacity(df.height());
    for (idx, raw) in source.into_iter().enumerate() {
        let raw = raw.ok_or_else(|| PipelineError::MalformedRow {
            row: idx,
            reason: "source_row is null".to_string(),
        })?;
        let parsed: Value = serde_json::from_str(raw).map_err(|err| PipelineError::MalformedRow {
            row: idx,
            reason: err.to_string(),
        })?;
        match parsed {
            Value::Object(object) => rows.push(flatten_object(object)),
            other => {
                return Err(PipelineError::MalformedRow {
                    row: idx,
                    reason: format!("expected a JSON object, found {other}"),
                })
            }
        }
    }

    let mut columns: Vec<Column> = Vec::new();
    if let Ok(id) = df.column(ID) {
        columns.push(id.clone());
    }
    columns.extend(objects_to_columns(&rows));

    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }
    Ok(DataFrame::new(columns)?)
}

/// Drops rows where any listed column is null or an empty string.
fn filter_missing(options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    let columns = options.columns("filter_missing", COLS_TO_FILTER_MISSING)?;
    require_columns("filter_missing", &df, columns)?;

    let mut keep = vec![true; df.height()];
    for name in columns {
        let column = df.column(name)?;
        if column.dtype() == &DataType::String {
            for (idx, value) in column.str()?.into_iter().enumerate() {
                if matches!(value, None | Some("")) {
                    keep[idx] = false;
                }
            }
        } else {
            for (idx, is_null) in column.is_null().into_iter().enumerate() {
                if is_null == Some(true) {
                    keep[idx] = false;
                }
            }
        }
    }

    let before = df.height();
    let filtered = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
    debug!(
        dropped = before - filtered.height(),
        "filtered rows with missing values"
    );
    Ok(filtered)
}

/// Runs each listed column through its normalization rule.
fn eliminate_invalid_values(options: &PipelineOptions, mut df: DataFrame) -> Result<DataFrame> {
    let columns = options.columns("eliminate_invalid_values", COLS_TO_ELIM_INVALID_VALUES)?;
    require_columns("eliminate_invalid_values", &df, columns)?;
    let today = Utc::now().date_naive();

    for name in columns {
        let rule = NormalizationRule::for_column(name)?;
        let original = df.column(name)?;
        let normalized = rule.normalize_column(original, today)?;
        debug!(
            column = name.as_str(),
            rule = rule.name(),
            eliminated = normalized.null_count().saturating_sub(original.null_count()),
            "eliminated invalid values"
        );
        df.with_column(normalized)?;
    }
    Ok(df)
}

/// Fills nulls with the mean of the non-null values. Numeric columns become
/// `Float64`; dates and datetimes keep their dtype (mean rounded to the unit).
fn impute_with_mean(options: &PipelineOptions, mut df: DataFrame) -> Result<DataFrame> {
    let columns = options.columns("impute_with_mean", COLS_TO_IMPUTE_WITH_MEAN)?;
    require_columns("impute_with_mean", &df, columns)?;

    for name in columns {
        let column = df.column(name)?;
        if column.null_count() == 0 {
            continue;
        }
        let dtype = column.dtype().clone();

        let imputed: Option<Series> = match &dtype {
            dt if dt.is_integer() || dt.is_float() => {
                let values = column.cast(&DataType::Float64)?;
                let values = values.f64()?;
                mean_of(values.into_iter().flatten()).map(|mean| {
                    let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(mean)).collect();
                    Series::new(name.as_str().into(), filled)
                })
            }
            DataType::Date => {
                let physical = column.cast(&DataType::Int32)?;
                let physical = physical.i32()?;
                match mean_of(physical.into_iter().flatten().map(f64::from)) {
                    Some(mean) => {
                        let fill = mean.round() as i32;
                        let filled: Vec<i32> =
                            physical.into_iter().map(|v| v.unwrap_or(fill)).collect();
                        Some(Series::new(name.as_str().into(), filled).cast(&dtype)?)
                    }
                    None => None,
                }
            }
            DataType::Datetime(_, _) => {
                let physical = column.cast(&DataType::Int64)?;
                let physical = physical.i64()?;
                match mean_of(physical.into_iter().flatten().map(|v| v as f64)) {
                    Some(mean) => {
                        let fill = mean.round() as i64;
                        let filled: Vec<i64> =
                            physical.into_iter().map(|v| v.unwrap_or(fill)).collect();
                        Some(Series::new(name.as_str().into(), filled).cast(&dtype)?)
                    }
                    None => None,
                }
            }
            other => {
                return Err(PipelineError::Configuration(format!(
                    "impute_with_mean needs a numeric or temporal column, '{name}' is {other}"
                )))
            }
        };

        match imputed {
            Some(series) => {
                df.with_column(series)?;
            }
            None => warn!(column = name.as_str(), "no values to average; nulls left in place"),
        }
    }
    Ok(df)
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Fills nulls with the most frequent value. Ties go to the value seen first.
fn impute_with_mode(options: &PipelineOptions, mut df: DataFrame) -> Result<DataFrame> {
    let columns = options.columns("impute_with_mode", COLS_TO_IMPUTE_WITH_MODE)?;
    require_columns("impute_with_mode", &df, columns)?;

    for name in columns {
        let column = df.column(name)?;
        if column.null_count() == 0 {
            continue;
        }

        let keys = column.cast(&DataType::String)?;
        let Some(mode_idx) = mode_position(keys.str()?) else {
            warn!(column = name.as_str(), "no values to take a mode of; nulls left in place");
            continue;
        };

        let indices: Vec<IdxSize> = column
            .is_null()
            .into_iter()
            .enumerate()
            .map(|(idx, is_null)| {
                if is_null == Some(true) {
                    mode_idx as IdxSize
                } else {
                    idx as IdxSize
                }
            })
            .collect();
        let gathered = column
            .as_materialized_series()
            .take(&IdxCa::from_vec("idx".into(), indices))?;
        df.with_column(gathered)?;
    }
    Ok(df)
}

/// Row index of the first occurrence of the most frequent non-null value.
fn mode_position(keys: &StringChunked) -> Option<usize> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, key) in keys.into_iter().enumerate() {
        if let Some(key) = key {
            counts.entry(key).or_insert((0, idx)).0 += 1;
        }
    }

    counts
        .into_values()
        .max_by(|(count_a, first_a), (count_b, first_b)| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(_, first)| first)
}

/// Stable ascending sort on the listed columns, nulls last.
fn sort(options: &PipelineOptions, df: DataFrame) -> Result<DataFrame> {
    let columns = options.columns("sort", COLS_TO_SORT_BY)?;
    require_columns("sort", &df, columns)?;

    let by: Vec<&str> = columns.iter().map(String::as_str).collect();
    let sorted = df.sort(
        by,
        SortMultipleOptions::default()
            .with_maintain_order(true)
            .with_nulls_last(true),
    )?;
    Ok(sorted)
}
