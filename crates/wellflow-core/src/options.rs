use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A single configuration value handed to pipeline steps.
///
/// Deserialization is untagged: integers stay integers, arrays become column
/// lists, RFC 3339 strings become timestamps and any other string is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Integer(i64),
    Columns(Vec<String>),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl OptionValue {
    fn kind(&self) -> &'static str {
        match self {
            OptionValue::Integer(_) => "an integer",
            OptionValue::Columns(_) => "a list of column names",
            OptionValue::Timestamp(_) => "a timestamp",
            OptionValue::Text(_) => "text",
        }
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<DateTime<Utc>> for OptionValue {
    fn from(value: DateTime<Utc>) -> Self {
        OptionValue::Timestamp(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::Columns(value)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(value: Vec<&str>) -> Self {
        OptionValue::Columns(value.into_iter().map(str::to_string).collect())
    }
}

/// Keyed options shared by every step of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineOptions {
    values: BTreeMap<String, OptionValue>,
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, convenient for literal option sets.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, step: &str, key: &str) -> Result<&OptionValue> {
        self.values
            .get(key)
            .ok_or_else(|| PipelineError::MissingOptions {
                step: step.to_string(),
                missing: vec![key.to_string()],
            })
    }

    pub fn integer(&self, step: &str, key: &str) -> Result<i64> {
        match self.require(step, key)? {
            OptionValue::Integer(value) => Ok(*value),
            OptionValue::Text(text) => text.trim().parse().map_err(|_| invalid(step, key, "an integer")),
            _ => Err(invalid(step, key, "an integer")),
        }
    }

    pub fn columns(&self, step: &str, key: &str) -> Result<&[String]> {
        match self.require(step, key)? {
            OptionValue::Columns(columns) => Ok(columns.as_slice()),
            other => {
                tracing::debug!(step, key, found = other.kind(), "option has wrong shape");
                Err(invalid(step, key, "a list of column names"))
            }
        }
    }

    pub fn value(&self, step: &str, key: &str) -> Result<&OptionValue> {
        self.require(step, key)
    }
}

fn invalid(step: &str, key: &str, expected: &'static str) -> PipelineError {
    PipelineError::InvalidOption {
        step: step.to_string(),
        key: key.to_string(),
        expected,
    }
}
